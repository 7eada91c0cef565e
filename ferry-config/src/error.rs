// Error types for configuration management

use ferry_storage::StorageError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Environment variable not set: {0}")]
    KeyNotFound(String),

    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ConfigError {
    /// Check if this is a backend configuration problem.
    pub fn is_invalid_backend(&self) -> bool {
        matches!(
            self,
            Self::Storage(StorageError::InvalidConfig(_) | StorageError::UnsupportedBackend(_))
        )
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;
