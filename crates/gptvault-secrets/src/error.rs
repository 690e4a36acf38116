//! Error types for the vault.

use thiserror::Error;

/// Errors that can occur during vault operations.
///
/// Messages carry provider ids and storage keys at most, never secret
/// values, passphrases, or key material.
#[derive(Debug, Error)]
pub enum VaultError {
    #[error("Secure storage unavailable: platform cryptography is missing")]
    CryptoUnavailable,

    #[error("Session is locked")]
    SessionLocked,

    #[error("Passphrase is already initialized")]
    AlreadyInitialized,

    #[error("Passphrase has not been initialized")]
    NotInitialized,

    #[error("Vault is already unlocked")]
    AlreadyUnlocked,

    #[error("Invalid passphrase")]
    InvalidPassphrase,

    #[error("Decryption failed")]
    Decryption,

    #[error("Encryption failed")]
    Encryption,

    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("Invalid provider id: {0}")]
    InvalidProvider(String),

    #[error("Corrupt record {key}: {reason}")]
    CorruptRecord { key: String, reason: String },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl VaultError {
    /// Errors that indicate a logic bug in the calling layer.
    pub fn is_caller_misuse(&self) -> bool {
        matches!(
            self,
            Self::SessionLocked
                | Self::AlreadyInitialized
                | Self::NotInitialized
                | Self::AlreadyUnlocked
                | Self::InvalidPassphrase
                | Self::InvalidProvider(_)
        )
    }

    /// Errors raised by the cryptographic layer itself.
    pub fn is_crypto_failure(&self) -> bool {
        matches!(
            self,
            Self::CryptoUnavailable | Self::Decryption | Self::Encryption | Self::KeyDerivation(_)
        )
    }
}

/// Convenience result alias for vault operations.
pub type Result<T> = std::result::Result<T, VaultError>;
