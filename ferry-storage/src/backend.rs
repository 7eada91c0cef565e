//! Backend contract and common types.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::Result;

/// Progress callback invoked by backends during a transfer.
///
/// Arguments are `(increment, transferred, total)` in bytes. Calls arrive in
/// strictly increasing `transferred` order and the last call on success has
/// `transferred == total`.
pub type ProgressFn<'a> = dyn Fn(u64, u64, u64) + Send + Sync + 'a;

/// Result of a completed upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadReceipt {
    /// Object name the file was stored under.
    pub object_name: String,
    /// Number of bytes stored.
    pub size: u64,
    /// Entity tag reported by the backend, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    /// Version identifier, for versioned buckets.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_id: Option<String>,
}

impl UploadReceipt {
    /// Create a receipt for an object.
    pub fn new(object_name: impl Into<String>, size: u64) -> Self {
        Self {
            object_name: object_name.into(),
            size,
            etag: None,
            version_id: None,
        }
    }

    /// Set the entity tag.
    pub fn with_etag(mut self, etag: impl Into<String>) -> Self {
        self.etag = Some(etag.into().trim_matches('"').to_string());
        self
    }

    /// Set the version id.
    pub fn with_version_id(mut self, version_id: impl Into<String>) -> Self {
        self.version_id = Some(version_id.into());
        self
    }
}

/// HTTP method a signed URL is valid for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignedMethod {
    /// Direct upload.
    Put,
    /// Download.
    Get,
}

impl SignedMethod {
    /// Method name as sent on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Put => "PUT",
            Self::Get => "GET",
        }
    }
}

/// A time-bounded URL produced by a backend's signing algorithm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedUrl {
    /// The signed URL.
    pub url: String,
    /// Headers the client must send with the request; may be empty.
    pub headers: HashMap<String, String>,
    /// Method the signature covers.
    pub method: SignedMethod,
    /// When the signature stops being accepted.
    pub expiration: DateTime<Utc>,
}

impl SignedUrl {
    /// Create a signed URL without extra headers.
    pub fn new(url: impl Into<String>, method: SignedMethod, ttl: Duration) -> Self {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        Self {
            url: url.into(),
            headers: HashMap::new(),
            method,
            expiration: Utc::now()
                .checked_add_signed(ttl)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    /// Attach signed headers.
    pub fn with_headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.headers
            .extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }
}

/// Capability interface every storage backend satisfies.
///
/// Instances are immutable after construction and shared read-only across
/// concurrent requests. Dropping a returned future cancels the operation.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Storage type tag this backend was registered under.
    fn storage_type(&self) -> &'static str;

    /// Stream a local file to `object_name`.
    ///
    /// `on_progress` is only called while this future is running.
    async fn upload(
        &self,
        object_name: &str,
        local_path: &Path,
        on_progress: Option<&ProgressFn<'_>>,
    ) -> Result<UploadReceipt>;

    /// Check whether an object exists.
    ///
    /// Failures are reported as [`crate::StorageError::ExistenceCheck`];
    /// callers are expected to treat them as "absent".
    async fn exists(&self, object_name: &str) -> Result<bool>;

    /// Produce a signed URL for uploading `object_name` directly.
    async fn sign_upload_url(&self, object_name: &str, ttl: Duration) -> Result<SignedUrl>;

    /// Produce a signed URL for downloading `object_name`.
    async fn sign_download_url(&self, object_name: &str, ttl: Duration) -> Result<SignedUrl>;

    /// Host prefix used to build unsigned object URLs.
    fn public_domain(&self) -> String;

    /// Unsigned URL of an object.
    fn public_url(&self, object_name: &str) -> String {
        let domain = self.public_domain();
        let domain = domain.trim_end_matches('/');
        let key = encode_object_path(object_name.trim_start_matches('/'));
        if domain.starts_with("http://") || domain.starts_with("https://") {
            format!("{}/{}", domain, key)
        } else {
            format!("https://{}/{}", domain, key)
        }
    }
}

/// Report a transfer step, if anyone is listening.
pub(crate) fn report(on_progress: Option<&ProgressFn<'_>>, increment: u64, transferred: u64, total: u64) {
    if let Some(callback) = on_progress {
        callback(increment, transferred, total);
    }
}

/// Percent-encode each path segment of an object name, keeping `/` separators.
pub fn encode_object_path(object_name: &str) -> String {
    object_name
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Final path component of an object name, used for download file names.
pub fn object_base_name(object_name: &str) -> &str {
    object_name
        .rsplit('/')
        .find(|segment| !segment.is_empty())
        .unwrap_or(object_name)
}

/// Guess a Content-Type from the file extension.
pub fn guess_content_type(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_object_path_keeps_separators() {
        assert_eq!(encode_object_path("docs/q1 report.pdf"), "docs/q1%20report.pdf");
        assert_eq!(encode_object_path("plain.txt"), "plain.txt");
    }

    #[test]
    fn test_object_base_name() {
        assert_eq!(object_base_name("a/b/c.txt"), "c.txt");
        assert_eq!(object_base_name("c.txt"), "c.txt");
        assert_eq!(object_base_name("dir/"), "dir");
    }

    #[test]
    fn test_guess_content_type() {
        assert_eq!(guess_content_type(Path::new("photo.JPG")), "image/jpeg");
        assert_eq!(guess_content_type(Path::new("report.pdf")), "application/pdf");
        assert_eq!(
            guess_content_type(Path::new("blob.unknownext")),
            "application/octet-stream"
        );
    }

    #[test]
    fn test_receipt_strips_etag_quotes() {
        let receipt = UploadReceipt::new("a.txt", 3).with_etag("\"abc\"");
        assert_eq!(receipt.etag.as_deref(), Some("abc"));
    }

    #[test]
    fn test_signed_url_expiration_in_future() {
        let signed = SignedUrl::new("https://x/y", SignedMethod::Get, Duration::from_secs(60));
        assert!(signed.expiration > Utc::now());
        assert!(signed.headers.is_empty());
        assert_eq!(signed.method.as_str(), "GET");
    }
}
