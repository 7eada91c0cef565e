//! Signed URL lifetimes.
//!
//! Direct uploads get more time the larger the file; downloads default to a
//! day and never exceed the seven days OSS accepts.

use ferry_storage::{SignedUrl, StorageBackend};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::{FerryError, Result};

const MIB: u64 = 1024 * 1024;
const GIB: u64 = 1024 * MIB;

/// Upload URL lifetime when the size is unknown or small.
pub const DEFAULT_UPLOAD_TTL: Duration = Duration::from_secs(10 * 60);
/// Download URL lifetime when none is requested.
pub const DEFAULT_DOWNLOAD_TTL: Duration = Duration::from_secs(24 * 60 * 60);
/// Longest download URL lifetime.
pub const MAX_DOWNLOAD_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Lifetime of an upload URL for a file of `file_size` bytes.
pub fn upload_ttl(file_size: Option<u64>) -> Duration {
    match file_size {
        Some(size) if size > GIB => Duration::from_secs(3 * 60 * 60),
        Some(size) if size > 500 * MIB => Duration::from_secs(60 * 60),
        Some(size) if size > 100 * MIB => Duration::from_secs(30 * 60),
        _ => DEFAULT_UPLOAD_TTL,
    }
}

/// Lifetime of a download URL, capped at [`MAX_DOWNLOAD_TTL`].
pub fn download_ttl(requested: Option<Duration>) -> Result<Duration> {
    match requested {
        None => Ok(DEFAULT_DOWNLOAD_TTL),
        Some(ttl) if ttl.is_zero() => Err(FerryError::InvalidRequest(
            "expiration must be positive".to_string(),
        )),
        Some(ttl) => Ok(ttl.min(MAX_DOWNLOAD_TTL)),
    }
}

/// Parse a lifetime such as `90s`, `30m`, `24h`, `7d` or `1h30m`.
pub fn parse_ttl(input: &str) -> Result<Duration> {
    let invalid =
        || FerryError::InvalidRequest(format!("invalid expiration {input:?}, use like 1h, 24h, 7d"));

    let input = input.trim();
    if input.is_empty() {
        return Err(invalid());
    }

    let mut total = 0u64;
    let mut digits = String::new();
    for ch in input.chars() {
        if ch.is_ascii_digit() {
            digits.push(ch);
            continue;
        }
        let unit = match ch {
            's' => 1,
            'm' => 60,
            'h' => 60 * 60,
            'd' => 24 * 60 * 60,
            _ => return Err(invalid()),
        };
        let value: u64 = digits.parse().map_err(|_| invalid())?;
        total = value
            .checked_mul(unit)
            .and_then(|secs| total.checked_add(secs))
            .ok_or_else(invalid)?;
        digits.clear();
    }
    if !digits.is_empty() {
        return Err(invalid());
    }

    Ok(Duration::from_secs(total))
}

/// Issues signed upload and download URLs with the lifetimes above.
#[derive(Clone)]
pub struct Presigner {
    backend: Arc<dyn StorageBackend>,
}

impl Presigner {
    /// Create a presigner over a backend.
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    /// Signed PUT URL for a direct upload of `file_size` bytes.
    pub async fn upload_url(&self, object_name: &str, file_size: Option<u64>) -> Result<SignedUrl> {
        if object_name.trim().is_empty() {
            return Err(FerryError::InvalidRequest("No file name provided".to_string()));
        }
        let ttl = upload_ttl(file_size);
        debug!(object = %object_name, ?file_size, ttl_secs = ttl.as_secs(), "Signing upload URL");
        Ok(self.backend.sign_upload_url(object_name, ttl).await?)
    }

    /// Signed GET URL, valid for `requested` (default one day, at most seven).
    pub async fn download_url(
        &self,
        object_name: &str,
        requested: Option<Duration>,
    ) -> Result<SignedUrl> {
        if object_name.trim().is_empty() {
            return Err(FerryError::InvalidRequest("No file name provided".to_string()));
        }
        let ttl = download_ttl(requested)?;
        debug!(object = %object_name, ttl_secs = ttl.as_secs(), "Signing download URL");
        Ok(self.backend.sign_download_url(object_name, ttl).await?)
    }
}

impl std::fmt::Debug for Presigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Presigner")
            .field("storage_type", &self.backend.storage_type())
            .finish()
    }
}
