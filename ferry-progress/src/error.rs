//! Push delivery errors.

use thiserror::Error;

/// Failure to deliver a progress message to a subscriber.
///
/// These never reach the uploading path; the hub logs and drops them.
#[derive(Error, Debug)]
pub enum PushError {
    /// The subscriber's channel is closed or closing.
    #[error("Connection closed")]
    ConnectionClosed,

    /// The writer task is gone.
    #[error("Failed to send message: {0}")]
    Send(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// WebSocket protocol error
    #[error("Protocol error: {0}")]
    Protocol(#[from] tungstenite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for push operations.
pub type PushResult<T> = Result<T, PushError>;
