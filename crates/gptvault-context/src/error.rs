//! Context error types.

use gptvault_secrets::VaultError;
use gptvault_session::SessionError;
use thiserror::Error;

/// Errors surfaced to vault consumers.
#[derive(Debug, Error)]
pub enum ContextError {
    /// The session is not unlocked.
    #[error("Session is locked")]
    SessionLocked,

    #[error(transparent)]
    Vault(#[from] VaultError),

    #[error(transparent)]
    Session(#[from] SessionError),
}

impl ContextError {
    /// Whether the operation failed only because the session is locked.
    pub fn is_session_locked(&self) -> bool {
        matches!(
            self,
            Self::SessionLocked | Self::Vault(VaultError::SessionLocked)
        )
    }

    /// Whether a stored secret failed to decrypt. Callers treat that secret
    /// as not configured and may offer to delete it.
    pub fn is_decryption_failure(&self) -> bool {
        matches!(self, Self::Vault(VaultError::Decryption))
    }
}

/// Result type for context operations.
pub type Result<T> = std::result::Result<T, ContextError>;
