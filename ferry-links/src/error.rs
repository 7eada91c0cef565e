//! Link registry errors.

use thiserror::Error;

/// Reasons a short link cannot be created.
///
/// A link that is missing or expired is not an error; lookups return `None`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    /// The requested expiration is not in the future.
    #[error("Link expiration {0} is not in the future")]
    AlreadyExpired(chrono::DateTime<chrono::Utc>),

    /// The long URL is empty.
    #[error("Long URL must not be empty")]
    EmptyUrl,

    /// No unused token could be generated.
    #[error("Could not generate an unused token after {0} attempts")]
    TokenExhausted(usize),
}

/// Result type for link operations.
pub type LinkResult<T> = Result<T, LinkError>;
