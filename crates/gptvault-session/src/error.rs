//! Session error types.

use thiserror::Error;

/// Session manager errors.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Rejected session configuration; nothing was changed.
    #[error("Invalid session config: {0}")]
    InvalidConfig(String),

    /// The inactivity timer needs a tokio runtime.
    #[error("No async runtime available to drive the session timer")]
    NoRuntime,
}

/// Result type for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;
