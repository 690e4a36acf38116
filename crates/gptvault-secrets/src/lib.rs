//! Passphrase-derived encrypted secret storage for GPTVault.
//!
//! Provider API keys are sealed with AES-256-GCM under a master key derived
//! from the user's passphrase with Argon2id. The master key lives only in
//! memory while the [`Vault`] is unlocked.

pub mod crypto;
pub mod error;
pub mod store;
pub mod types;
pub mod vault;

pub use crypto::{is_crypto_available, KdfParams, KeyHandle, SealedBox};
pub use error::{Result, VaultError};
pub use store::{FileStore, KvStore, MemoryStore};
pub use types::{EncryptedSecretRecord, SecretRef, VaultMeta};
pub use vault::{Vault, VaultState};
