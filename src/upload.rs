//! Server-side upload flow.

use ferry_progress::{ProgressService, ProgressThrottle, percentage};
use ferry_storage::{StorageBackend, UploadReceipt};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::{AppContext, FerryError, Result};

/// What happened to an upload request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum UploadOutcome {
    /// The object was already stored; nothing was transferred.
    #[serde(rename_all = "camelCase")]
    AlreadyExists {
        /// Object name that was found.
        object_name: String,
        /// Public URL of the existing object.
        url: String,
    },
    /// The file was transferred.
    #[serde(rename_all = "camelCase")]
    Uploaded {
        /// Backend receipt.
        receipt: UploadReceipt,
        /// Public URL of the new object.
        url: String,
    },
}

impl UploadOutcome {
    /// Public URL of the object.
    pub fn url(&self) -> &str {
        match self {
            Self::AlreadyExists { url, .. } | Self::Uploaded { url, .. } => url,
        }
    }

    /// Check whether the transfer was skipped.
    pub fn skipped(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }
}

/// Streams files to the backend while publishing progress for an upload-id.
#[derive(Clone)]
pub struct Uploader {
    backend: Arc<dyn StorageBackend>,
    progress: Arc<ProgressService>,
}

impl Uploader {
    /// Create an uploader over the context's backend and progress service.
    pub fn new(context: &AppContext) -> Self {
        Self {
            backend: Arc::clone(context.backend()),
            progress: Arc::clone(context.progress()),
        }
    }

    /// Upload `local_path` as `object_name`, reporting progress under
    /// `upload_id`.
    ///
    /// An object that already exists is not transferred again. A failing
    /// existence probe is logged and treated as "absent".
    pub async fn upload(
        &self,
        upload_id: &str,
        object_name: &str,
        local_path: &Path,
    ) -> Result<UploadOutcome> {
        if upload_id.trim().is_empty() {
            return Err(FerryError::InvalidRequest("No upload ID provided".to_string()));
        }
        if object_name.trim().is_empty() {
            return Err(FerryError::InvalidRequest("No file name provided".to_string()));
        }

        match self.backend.exists(object_name).await {
            Ok(true) => {
                let url = self.backend.public_url(object_name);
                info!(upload_id = %upload_id, object = %object_name, url = %url, "Object exists, skipping upload");
                return Ok(UploadOutcome::AlreadyExists {
                    object_name: object_name.to_string(),
                    url,
                });
            }
            Ok(false) => {}
            Err(e) => {
                warn!(object = %object_name, error = %e, "Existence check failed, uploading anyway");
            }
        }

        let forward = self.progress.callback(upload_id, object_name);
        let throttle = ProgressThrottle::new();
        let log_id = upload_id.to_string();
        let log_object = object_name.to_string();
        let on_progress = move |increment: u64, transferred: u64, total: u64| {
            forward(increment, transferred, total);
            if throttle.should_emit(transferred, total) {
                info!(
                    upload_id = %log_id,
                    object = %log_object,
                    percentage = percentage(transferred, total),
                    transferred,
                    total,
                    "Upload progress"
                );
            }
        };

        let started = Instant::now();
        let receipt = self
            .backend
            .upload(object_name, local_path, Some(&on_progress))
            .await?;
        let url = self.backend.public_url(&receipt.object_name);

        info!(
            upload_id = %upload_id,
            object = %receipt.object_name,
            size = receipt.size,
            elapsed_ms = started.elapsed().as_millis() as u64,
            url = %url,
            "Upload complete"
        );

        Ok(UploadOutcome::Uploaded { receipt, url })
    }
}

impl std::fmt::Debug for Uploader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Uploader")
            .field("storage_type", &self.backend.storage_type())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferry_storage::{LocalBackend, LocalConfig};

    #[tokio::test]
    async fn test_rejects_missing_upload_id() {
        let temp_dir = tempfile::tempdir().unwrap();
        let source = temp_dir.path().join("a.txt");
        std::fs::write(&source, b"abc").unwrap();
        let backend = LocalBackend::new(LocalConfig::new(temp_dir.path().join("store"), "http://f.test", "k"))
            .await
            .unwrap();
        let context = AppContext::new(Arc::new(backend));
        let uploader = Uploader::new(&context);

        let err = uploader.upload("", "a.txt", &source).await.unwrap_err();
        assert!(matches!(err, FerryError::InvalidRequest(ref m) if m == "No upload ID provided"));
        assert_eq!(err.status_code(), 400);
        let err = uploader.upload("u1", " ", &source).await.unwrap_err();
        assert!(matches!(err, FerryError::InvalidRequest(_)));

        assert!(!temp_dir.path().join("store/a.txt").exists());
        assert!(context.progress().tracker().is_empty());
    }

    #[test]
    fn test_outcome_serialization() {
        let outcome = UploadOutcome::Uploaded {
            receipt: UploadReceipt::new("a.txt", 3),
            url: "https://b.example/a.txt".to_string(),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "uploaded");
        assert_eq!(json["receipt"]["objectName"], "a.txt");
        assert!(!outcome.skipped());

        let outcome = UploadOutcome::AlreadyExists {
            object_name: "a.txt".to_string(),
            url: "https://b.example/a.txt".to_string(),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "alreadyExists");
        assert_eq!(json["objectName"], "a.txt");
        assert_eq!(outcome.url(), "https://b.example/a.txt");
        assert!(outcome.skipped());
    }
}
