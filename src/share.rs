//! Short share links over signed download URLs.
//!
//! A shared link looks like `<base>/s/<token>/<url-encoded file name>`.
//! Opening it yields a temporary redirect to the signed URL with a
//! `Content-Disposition` that names the file.

use chrono::{DateTime, Utc};
use ferry_links::{LinkRegistry, ShortLink, composite_id};
use ferry_storage::SignedUrl;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::{FerryError, Result};

/// Route prefix of short links.
pub const SHARE_PREFIX: &str = "/s/";

/// Status used for short link redirects.
pub const REDIRECT_STATUS: u16 = 307;

/// A minted short link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedLink {
    /// Absolute short URL
    #[serde(rename = "shortURL")]
    pub short_url: String,
    /// `token/<encoded file name>`
    pub id: String,
    /// Bare token
    pub token: String,
    /// File name offered to the downloader
    pub file_name: String,
    /// When the link stops resolving
    pub expiration: DateTime<Utc>,
}

/// Where a short link sends the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    /// HTTP status, always [`REDIRECT_STATUS`]
    pub status: u16,
    /// `Location` header
    pub location: String,
    /// `Content-Disposition` header
    pub content_disposition: String,
}

impl Redirect {
    fn to(location: String, file_name: &str) -> Self {
        Self {
            status: REDIRECT_STATUS,
            location,
            content_disposition: content_disposition(file_name),
        }
    }
}

/// `attachment` disposition with `"` and `\` escaped in the quoted name.
fn content_disposition(file_name: &str) -> String {
    let mut value = String::with_capacity(file_name.len() + 24);
    value.push_str("attachment; filename=\"");
    for c in file_name.chars() {
        if matches!(c, '"' | '\\') {
            value.push('\\');
        }
        value.push(c);
    }
    value.push('"');
    value
}

/// Mints and opens short links.
#[derive(Debug, Clone)]
pub struct ShareService {
    links: Arc<LinkRegistry>,
    base_url: String,
}

impl ShareService {
    /// Create a service minting URLs under `base_url` (scheme and host).
    pub fn new(links: Arc<LinkRegistry>, base_url: impl Into<String>) -> Self {
        Self {
            links,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Shorten `long_url` until `expiration`.
    pub fn share(
        &self,
        long_url: &str,
        file_name: &str,
        expiration: DateTime<Utc>,
    ) -> Result<SharedLink> {
        if file_name.is_empty() {
            return Err(FerryError::InvalidRequest(
                "Missing required parameters".to_string(),
            ));
        }
        let link = self.links.create_link(long_url, file_name, expiration)?;
        let shared = self.shared(link);
        info!(short_url = %shared.short_url, expiration = %shared.expiration, "Short link created");
        Ok(shared)
    }

    /// Shorten a signed URL for as long as its signature is valid.
    pub fn share_signed(&self, signed: &SignedUrl, file_name: &str) -> Result<SharedLink> {
        self.share(&signed.url, file_name, signed.expiration)
    }

    fn shared(&self, link: ShortLink) -> SharedLink {
        SharedLink {
            short_url: format!("{}{}{}", self.base_url, SHARE_PREFIX, link.composite_id),
            id: link.composite_id,
            token: link.token,
            file_name: link.file_name,
            expiration: link.expiration,
        }
    }

    /// Resolve a `(token, file name)` pair taken from a short URL.
    ///
    /// The bare token is tried first, then the legacy composite form.
    pub fn open(&self, token: &str, file_name: &str) -> Result<Redirect> {
        let file_name = file_name.trim_start_matches('/');
        let resolved = self.links.resolve(token).or_else(|| {
            let id = if file_name.is_empty() {
                token.to_string()
            } else {
                composite_id(token, file_name)
            };
            debug!(id = %id, "Retrying short link with composite id");
            self.links.resolve_composite(&id)
        });

        match resolved {
            Some(target) => {
                debug!(token = %token, location = %target.long_url, "Short link redirect");
                Ok(Redirect::to(target.long_url, &target.file_name))
            }
            None => {
                debug!(token = %token, "Short link missing or expired");
                Err(FerryError::LinkNotFound(token.to_string()))
            }
        }
    }

    /// Resolve a request path such as `/s/<token>/<encoded file name>`.
    pub fn open_path(&self, path: &str) -> Result<Redirect> {
        let rest = path
            .strip_prefix(SHARE_PREFIX)
            .filter(|rest| !rest.is_empty())
            .ok_or_else(|| FerryError::LinkNotFound(path.to_string()))?;
        let (token, encoded) = rest.split_once('/').unwrap_or((rest, ""));
        let file_name = urlencoding::decode(encoded)
            .map_err(|_| FerryError::InvalidRequest(format!("malformed file name in {path}")))?;
        self.open(token, &file_name)
    }
}
