//! Short link records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An alias from a short token to a signed URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortLink {
    /// Short token the link is stored under
    pub token: String,
    /// `token/<url-encoded file name>`, accepted by the legacy lookup
    pub composite_id: String,
    /// Signed URL the link redirects to
    pub long_url: String,
    /// File name offered to the downloader
    pub file_name: String,
    /// After this instant the link no longer resolves
    pub expiration: DateTime<Utc>,
}

impl ShortLink {
    /// Check whether the link is expired at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expiration
    }

    /// The resolved target.
    pub fn target(&self) -> ResolvedLink {
        ResolvedLink {
            long_url: self.long_url.clone(),
            file_name: self.file_name.clone(),
        }
    }
}

/// What a token resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedLink {
    /// Signed URL
    pub long_url: String,
    /// File name
    pub file_name: String,
}

/// Build the composite id for a token and file name.
pub fn composite_id(token: &str, file_name: &str) -> String {
    format!("{}/{}", token, urlencoding::encode(file_name))
}
