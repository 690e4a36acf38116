//! Persisted record types.
//!
//! Binary fields are stored as text inside JSON: the salt hex-encoded, and
//! nonce, ciphertext, and tag base64-encoded.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::crypto::{self, KdfParams, KeyHandle, SealedBox, MIN_SALT_SIZE, NONCE_SIZE, TAG_SIZE};
use crate::error::{Result, VaultError};

/// Current on-disk format version for records and metadata.
pub const FORMAT_VERSION: u32 = 1;

/// The persisted master-key salt and the KDF cost it was used with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultMeta {
    pub version: u32,
    /// Hex-encoded salt.
    pub salt: String,
    pub kdf: KdfParams,
    pub created_at: DateTime<Utc>,
}

impl VaultMeta {
    pub fn new(salt: &[u8], kdf: KdfParams) -> Self {
        Self {
            version: FORMAT_VERSION,
            salt: hex::encode(salt),
            kdf,
            created_at: Utc::now(),
        }
    }

    /// Decode and sanity-check the salt.
    pub fn salt_bytes(&self) -> Result<Vec<u8>> {
        let salt = hex::decode(&self.salt).map_err(|e| VaultError::CorruptRecord {
            key: "vault/meta".to_string(),
            reason: format!("salt is not valid hex: {e}"),
        })?;
        if salt.len() < MIN_SALT_SIZE {
            return Err(VaultError::CorruptRecord {
                key: "vault/meta".to_string(),
                reason: format!("salt is only {} bytes", salt.len()),
            });
        }
        Ok(salt)
    }
}

/// One provider's sealed API key.
///
/// The storage key of the record is bound into the ciphertext as associated
/// data, so a record copied under another provider's key fails to open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedSecretRecord {
    pub version: u32,
    pub provider: String,
    pub iv: String,
    pub ciphertext: String,
    pub tag: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EncryptedSecretRecord {
    /// Encrypt `plaintext` into a new record.
    ///
    /// `created_at` carries over the original creation time when an existing
    /// record is overwritten.
    pub fn seal(
        key: &KeyHandle,
        provider: &str,
        aad: &[u8],
        plaintext: &[u8],
        created_at: Option<DateTime<Utc>>,
    ) -> Result<Self> {
        let sealed = crypto::encrypt(key, plaintext, aad)?;
        let now = Utc::now();
        Ok(Self {
            version: FORMAT_VERSION,
            provider: provider.to_string(),
            iv: BASE64.encode(sealed.iv),
            ciphertext: BASE64.encode(&sealed.ciphertext),
            tag: BASE64.encode(sealed.tag),
            created_at: created_at.unwrap_or(now),
            updated_at: now,
        })
    }

    /// Decrypt the record.
    ///
    /// Malformed encodings are reported as [`VaultError::Decryption`], the
    /// same as an authentication failure.
    pub fn open(&self, key: &KeyHandle, aad: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        let sealed = self.sealed_box().map_err(|reason| {
            tracing::warn!(provider = %self.provider, %reason, "malformed secret record");
            VaultError::Decryption
        })?;
        crypto::decrypt(key, &sealed, aad)
    }

    fn sealed_box(&self) -> std::result::Result<SealedBox, String> {
        if self.version != FORMAT_VERSION {
            return Err(format!("unsupported record version {}", self.version));
        }

        let iv: [u8; NONCE_SIZE] = BASE64
            .decode(&self.iv)
            .map_err(|e| format!("iv: {e}"))?
            .try_into()
            .map_err(|_| "iv has wrong length".to_string())?;
        let tag: [u8; TAG_SIZE] = BASE64
            .decode(&self.tag)
            .map_err(|e| format!("tag: {e}"))?
            .try_into()
            .map_err(|_| "tag has wrong length".to_string())?;
        let ciphertext = BASE64
            .decode(&self.ciphertext)
            .map_err(|e| format!("ciphertext: {e}"))?;

        Ok(SealedBox {
            iv,
            ciphertext,
            tag,
        })
    }

    /// Metadata view of this record as stored under `provider`.
    ///
    /// The id comes from the storage key, not the `provider` field, so a
    /// record copied under another key is listed where it actually lives.
    pub fn to_ref(&self, provider: &str) -> SecretRef {
        SecretRef {
            provider: provider.to_string(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// A lightweight reference to a stored secret.
///
/// Contains only metadata, no plaintext or ciphertext, so it is safe to
/// pass around, log, or serialize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretRef {
    /// Provider identifier (e.g. "openai").
    pub provider: String,

    /// When the secret was first stored.
    pub created_at: DateTime<Utc>,

    /// When the secret was last overwritten.
    pub updated_at: DateTime<Utc>,
}
