//! Storage error types.

use thiserror::Error;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Storage backend errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A required backend field is missing or malformed.
    #[error("Invalid storage configuration: {0}")]
    InvalidConfig(String),

    /// No constructor is registered for the storage type tag.
    #[error("Unsupported storage type: {0}")]
    UnsupportedBackend(String),

    /// The backend could not be created (credentials, connectivity, bucket).
    #[error("Failed to initialize {backend} backend: {message}")]
    Construction {
        /// Storage type tag of the failing backend.
        backend: String,
        /// Underlying failure.
        message: String,
    },

    /// Upload or signing failed.
    #[error("Object operation failed for {object}: {message}")]
    ObjectIo {
        /// Object name the operation targeted.
        object: String,
        /// Underlying failure.
        message: String,
    },

    /// The existence probe itself failed.
    #[error("Existence check failed for {object}: {message}")]
    ExistenceCheck {
        /// Object name that was probed.
        object: String,
        /// Underlying failure.
        message: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    /// Shorthand for an [`StorageError::ObjectIo`].
    pub fn object_io(object: impl Into<String>, message: impl ToString) -> Self {
        Self::ObjectIo {
            object: object.into(),
            message: message.to_string(),
        }
    }

    /// Shorthand for a [`StorageError::Construction`].
    pub fn construction(backend: impl Into<String>, message: impl ToString) -> Self {
        Self::Construction {
            backend: backend.into(),
            message: message.to_string(),
        }
    }

    /// Check if this is a configuration error.
    pub fn is_invalid_config(&self) -> bool {
        matches!(self, Self::InvalidConfig(_))
    }

    /// Check if this is an unsupported backend error.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::UnsupportedBackend(_))
    }

    /// Errors that must abort startup rather than a single request.
    pub fn is_startup_fatal(&self) -> bool {
        matches!(
            self,
            Self::InvalidConfig(_) | Self::UnsupportedBackend(_) | Self::Construction { .. }
        )
    }

    /// Convert to HTTP status code.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidConfig(_) | Self::UnsupportedBackend(_) => 500,
            Self::Construction { .. } => 503,
            Self::ObjectIo { .. } | Self::ExistenceCheck { .. } => 502,
            Self::Io(_) => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_startup_fatal_classification() {
        assert!(StorageError::InvalidConfig("bucket".into()).is_startup_fatal());
        assert!(StorageError::UnsupportedBackend("gcs".into()).is_startup_fatal());
        assert!(StorageError::construction("minio", "refused").is_startup_fatal());
        assert!(!StorageError::object_io("a.txt", "timeout").is_startup_fatal());
    }

    #[test]
    fn test_display_carries_detail() {
        let err = StorageError::object_io("report.pdf", "connection reset");
        assert_eq!(
            err.to_string(),
            "Object operation failed for report.pdf: connection reset"
        );
        assert_eq!(err.status_code(), 502);
    }
}
