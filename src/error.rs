//! Top-level error type.

use ferry_config::ConfigError;
use ferry_links::LinkError;
use ferry_log::LogError;
use ferry_progress::PushError;
use ferry_storage::StorageError;
use thiserror::Error;

/// Result type for ferry operations.
pub type Result<T> = std::result::Result<T, FerryError>;

/// Errors surfaced by the upload flow, share links and the service binary.
#[derive(Debug, Error)]
pub enum FerryError {
    /// Storage backend failure.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Configuration could not be loaded or validated.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A short link could not be created.
    #[error(transparent)]
    Link(#[from] LinkError),

    /// The progress server failed.
    #[error(transparent)]
    Push(#[from] PushError),

    /// Logging could not be installed.
    #[error(transparent)]
    Log(#[from] LogError),

    /// No live short link matches the request.
    #[error("Link not found or expired: {0}")]
    LinkNotFound(String),

    /// A request parameter was rejected.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FerryError {
    /// Errors that must stop the process during startup.
    pub fn is_startup_fatal(&self) -> bool {
        match self {
            Self::Storage(e) => e.is_startup_fatal(),
            Self::Config(ConfigError::Storage(e)) => e.is_startup_fatal(),
            Self::Config(_) | Self::Log(_) => true,
            _ => false,
        }
    }

    /// HTTP status an edge handler should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Storage(e) => e.status_code(),
            Self::LinkNotFound(_) => 404,
            Self::InvalidRequest(_) | Self::Link(_) => 400,
            _ => 500,
        }
    }
}
