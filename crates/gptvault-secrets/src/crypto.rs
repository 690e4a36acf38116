//! AES-256-GCM sealing with Argon2id passphrase key derivation.
//!
//! This module is the only place that touches cipher and KDF crates. Every
//! failure is mapped to a [`VaultError`] so no raw cryptographic error type
//! crosses this boundary, and decryption failures carry no detail that
//! would distinguish a wrong key from tampered data.

use std::fmt;

use aes_gcm::aead::{Aead, Payload};
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use argon2::{Algorithm, Argon2, Params, Version};
use gptvault_core::config::KdfConfig;
use gptvault_core::secret::constant_time_eq;
use gptvault_core::SecretString;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::error::{Result, VaultError};

pub const KEY_SIZE: usize = 32;
pub const NONCE_SIZE: usize = 12;
pub const TAG_SIZE: usize = 16;
pub const SALT_SIZE: usize = 32;
pub const MIN_SALT_SIZE: usize = 16;

/// Argon2id cost parameters.
///
/// Persisted next to the salt so a vault stays openable after the
/// configured defaults change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    /// Time cost (passes over memory).
    pub iterations: u32,
    /// Memory cost in KiB.
    pub memory_kib: u32,
    /// Lanes.
    pub parallelism: u32,
}

impl KdfParams {
    pub fn new(iterations: u32, memory_kib: u32, parallelism: u32) -> Self {
        Self {
            iterations,
            memory_kib,
            parallelism,
        }
    }

    fn argon2(&self) -> Result<Argon2<'static>> {
        let params = Params::new(
            self.memory_kib,
            self.iterations,
            self.parallelism,
            Some(KEY_SIZE),
        )
        .map_err(|e| VaultError::KeyDerivation(format!("invalid argon2 params: {e}")))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

impl Default for KdfParams {
    fn default() -> Self {
        KdfConfig::default().into()
    }
}

impl From<KdfConfig> for KdfParams {
    fn from(config: KdfConfig) -> Self {
        Self::new(config.iterations, config.memory_kib, config.parallelism)
    }
}

/// A derived 256-bit symmetric key. Zeroed on drop, never printed.
pub struct KeyHandle {
    bytes: Zeroizing<[u8; KEY_SIZE]>,
}

impl KeyHandle {
    /// Constant-time comparison against another key.
    pub fn ct_eq(&self, other: &KeyHandle) -> bool {
        constant_time_eq(&self.bytes[..], &other.bytes[..])
    }

    fn cipher(&self) -> Result<Aes256Gcm> {
        Aes256Gcm::new_from_slice(&self.bytes[..]).map_err(|_| VaultError::Encryption)
    }
}

impl fmt::Debug for KeyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("KeyHandle([REDACTED])")
    }
}

/// Output of [`encrypt`]: nonce, ciphertext, and detached GCM tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedBox {
    pub iv: [u8; NONCE_SIZE],
    pub ciphertext: Vec<u8>,
    pub tag: [u8; TAG_SIZE],
}

/// Whether the platform can supply secure randomness. Never panics.
pub fn is_crypto_available() -> bool {
    let mut sample = [0u8; 16];
    OsRng.try_fill_bytes(&mut sample).is_ok()
}

/// Fill `n` bytes from the OS RNG.
pub fn random_bytes(n: usize) -> Result<Vec<u8>> {
    let mut out = vec![0u8; n];
    OsRng
        .try_fill_bytes(&mut out)
        .map_err(|_| VaultError::CryptoUnavailable)?;
    Ok(out)
}

/// Generate a fresh master-key salt.
pub fn generate_salt() -> Result<Vec<u8>> {
    random_bytes(SALT_SIZE)
}

/// Derive a key from `passphrase` and `salt`. Deterministic for equal inputs.
///
/// CPU and memory heavy; async callers should use [`derive_key_blocking`].
pub fn derive_key(passphrase: &[u8], salt: &[u8], params: &KdfParams) -> Result<KeyHandle> {
    if !is_crypto_available() {
        return Err(VaultError::CryptoUnavailable);
    }
    if salt.len() < MIN_SALT_SIZE {
        return Err(VaultError::KeyDerivation(format!(
            "salt must be at least {MIN_SALT_SIZE} bytes, got {}",
            salt.len()
        )));
    }

    let mut bytes = Zeroizing::new([0u8; KEY_SIZE]);
    params
        .argon2()?
        .hash_password_into(passphrase, salt, &mut bytes[..])
        .map_err(|e| VaultError::KeyDerivation(e.to_string()))?;

    Ok(KeyHandle { bytes })
}

/// Run [`derive_key`] on the blocking thread pool.
pub async fn derive_key_blocking(
    passphrase: SecretString,
    salt: Vec<u8>,
    params: KdfParams,
) -> Result<KeyHandle> {
    tokio::task::spawn_blocking(move || derive_key(passphrase.expose_bytes(), &salt, &params))
        .await
        .map_err(|e| VaultError::KeyDerivation(format!("derivation task failed: {e}")))?
}

/// Seal `plaintext` under `key` with a fresh random nonce.
///
/// `aad` is authenticated but not encrypted; it must be supplied again on
/// [`decrypt`].
pub fn encrypt(key: &KeyHandle, plaintext: &[u8], aad: &[u8]) -> Result<SealedBox> {
    let mut iv = [0u8; NONCE_SIZE];
    OsRng
        .try_fill_bytes(&mut iv)
        .map_err(|_| VaultError::CryptoUnavailable)?;

    let mut ciphertext = key
        .cipher()?
        .encrypt(Nonce::from_slice(&iv), Payload { msg: plaintext, aad })
        .map_err(|_| VaultError::Encryption)?;

    // aes-gcm appends the tag; store it detached.
    let tag_start = ciphertext
        .len()
        .checked_sub(TAG_SIZE)
        .ok_or(VaultError::Encryption)?;
    let mut tag = [0u8; TAG_SIZE];
    tag.copy_from_slice(&ciphertext[tag_start..]);
    ciphertext.truncate(tag_start);

    Ok(SealedBox {
        iv,
        ciphertext,
        tag,
    })
}

/// Open a [`SealedBox`]. Any authentication failure is [`VaultError::Decryption`].
pub fn decrypt(key: &KeyHandle, sealed: &SealedBox, aad: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    let mut combined = Vec::with_capacity(sealed.ciphertext.len() + TAG_SIZE);
    combined.extend_from_slice(&sealed.ciphertext);
    combined.extend_from_slice(&sealed.tag);

    let plaintext = key
        .cipher()
        .map_err(|_| VaultError::Decryption)?
        .decrypt(
            Nonce::from_slice(&sealed.iv),
            Payload {
                msg: &combined,
                aad,
            },
        )
        .map_err(|_| VaultError::Decryption)?;

    Ok(Zeroizing::new(plaintext))
}

#[cfg(test)]
pub(crate) fn test_params() -> KdfParams {
    KdfParams::new(1, 8, 1)
}
