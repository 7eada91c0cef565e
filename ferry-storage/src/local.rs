//! Local filesystem storage backend.

use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, info};

use crate::backend::{encode_object_path, report};
use crate::{
    BackendConfig, BackendRegistry, LocalConfig, ProgressFn, Result, SignedMethod, SignedUrl,
    StorageBackend, StorageError, TYPE_LOCAL, UploadReceipt,
};

type HmacSha256 = Hmac<Sha256>;

/// Register the local backend constructor.
pub(crate) fn register(registry: &BackendRegistry) {
    registry.register(TYPE_LOCAL, |config| {
        Box::pin(async move {
            match config {
                BackendConfig::Local(config) => {
                    let backend = LocalBackend::new(config).await?;
                    Ok(Arc::new(backend) as Arc<dyn StorageBackend>)
                }
                other => Err(StorageError::InvalidConfig(format!(
                    "local backend cannot be built from a {} configuration",
                    other.storage_type()
                ))),
            }
        })
    });
}

/// Filesystem backend serving objects from a directory.
///
/// Signed URLs carry `expires` (unix seconds) and `signature` (hex
/// HMAC-SHA256 over method, object name and expiry) query parameters; the
/// component serving the directory checks them with
/// [`LocalBackend::verify_signature`].
#[derive(Debug, Clone)]
pub struct LocalBackend {
    config: LocalConfig,
}

impl LocalBackend {
    /// Create the backend, creating the root directory if needed.
    pub async fn new(config: LocalConfig) -> Result<Self> {
        config.validate()?;

        fs::create_dir_all(&config.root).await.map_err(|e| {
            StorageError::construction(
                TYPE_LOCAL,
                format!("cannot create {}: {}", config.root.display(), e),
            )
        })?;

        info!(path = ?config.root, "Initialized local storage");

        Ok(Self { config })
    }

    /// Filesystem path of an object, refusing names that leave the root.
    fn object_path(&self, object_name: &str) -> Result<PathBuf> {
        let relative = Path::new(object_name.trim_start_matches('/'));
        let mut components = relative.components().peekable();
        if components.peek().is_none() {
            return Err(StorageError::object_io(object_name, "empty object name"));
        }
        if !components.all(|c| matches!(c, Component::Normal(_))) {
            return Err(StorageError::object_io(
                object_name,
                "object name escapes the storage root",
            ));
        }
        Ok(self.config.root.join(relative))
    }

    fn signature(&self, method: SignedMethod, object_name: &str, expires: i64) -> HmacSha256 {
        // HMAC accepts keys of any length.
        let mut mac = HmacSha256::new_from_slice(self.config.signing_secret.as_bytes())
            .unwrap_or_else(|_| unreachable!());
        mac.update(method.as_str().as_bytes());
        mac.update(b"\n");
        mac.update(object_name.trim_start_matches('/').as_bytes());
        mac.update(b"\n");
        mac.update(expires.to_string().as_bytes());
        mac
    }

    fn sign(&self, method: SignedMethod, object_name: &str, ttl: Duration) -> Result<SignedUrl> {
        self.object_path(object_name)?;
        let signed = SignedUrl::new(self.public_url(object_name), method, ttl);
        let expires = signed.expiration.timestamp();
        let signature = hex::encode(
            self.signature(method, object_name, expires)
                .finalize()
                .into_bytes(),
        );
        let url = format!("{}?expires={}&signature={}", signed.url, expires, signature);
        Ok(SignedUrl { url, ..signed })
    }

    /// Check a signature produced by [`StorageBackend::sign_upload_url`] or
    /// [`StorageBackend::sign_download_url`].
    pub fn verify_signature(
        &self,
        method: SignedMethod,
        object_name: &str,
        expires: i64,
        signature: &str,
    ) -> bool {
        if Utc::now().timestamp() > expires {
            return false;
        }
        let Ok(expected) = hex::decode(signature) else {
            return false;
        };
        self.signature(method, object_name, expires)
            .verify_slice(&expected)
            .is_ok()
    }

    async fn copy_to(
        &self,
        source: &mut fs::File,
        partial: &Path,
        total: u64,
        on_progress: Option<&ProgressFn<'_>>,
    ) -> Result<u64> {
        let mut target = fs::File::create(partial).await?;
        let mut buffer = vec![0u8; self.config.chunk_size];
        let mut transferred = 0u64;
        loop {
            let read = source.read(&mut buffer).await?;
            if read == 0 {
                break;
            }
            target.write_all(&buffer[..read]).await?;
            transferred += read as u64;
            report(on_progress, read as u64, transferred, total.max(transferred));
        }
        target.flush().await?;

        if transferred == 0 {
            report(on_progress, 0, 0, 0);
        }
        Ok(transferred)
    }
}

#[async_trait]
impl StorageBackend for LocalBackend {
    fn storage_type(&self) -> &'static str {
        TYPE_LOCAL
    }

    async fn upload(
        &self,
        object_name: &str,
        local_path: &Path,
        on_progress: Option<&ProgressFn<'_>>,
    ) -> Result<UploadReceipt> {
        let destination = self.object_path(object_name)?;
        let mut source = fs::File::open(local_path)
            .await
            .map_err(|e| StorageError::object_io(object_name, format!("cannot open source: {e}")))?;
        let total = source.metadata().await?.len();

        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Write beside the destination so a partial copy is never visible.
        let mut partial = destination.clone().into_os_string();
        partial.push(".ferry-partial");
        let partial = PathBuf::from(partial);

        let copied = match self.copy_to(&mut source, &partial, total, on_progress).await {
            Ok(transferred) => fs::rename(&partial, &destination)
                .await
                .map(|()| transferred)
                .map_err(StorageError::from),
            Err(e) => Err(e),
        };
        let transferred = match copied {
            Ok(transferred) => transferred,
            Err(e) => {
                if let Err(cleanup) = fs::remove_file(&partial).await {
                    debug!(path = %partial.display(), error = %cleanup, "Partial file not removed");
                }
                return Err(e);
            }
        };
        debug!(object = %object_name, size = transferred, "Stored file");

        Ok(UploadReceipt::new(object_name.trim_start_matches('/'), transferred))
    }

    async fn exists(&self, object_name: &str) -> Result<bool> {
        let path = self.object_path(object_name)?;
        fs::try_exists(&path)
            .await
            .map_err(|e| StorageError::ExistenceCheck {
                object: object_name.to_string(),
                message: e.to_string(),
            })
    }

    async fn sign_upload_url(&self, object_name: &str, ttl: Duration) -> Result<SignedUrl> {
        self.sign(SignedMethod::Put, object_name, ttl)
    }

    async fn sign_download_url(&self, object_name: &str, ttl: Duration) -> Result<SignedUrl> {
        self.sign(SignedMethod::Get, object_name, ttl)
    }

    fn public_domain(&self) -> String {
        self.config.public_base_url.trim_end_matches('/').to_string()
    }

    fn public_url(&self, object_name: &str) -> String {
        format!(
            "{}/{}",
            self.public_domain(),
            encode_object_path(object_name.trim_start_matches('/'))
        )
    }
}
