//! The encryption service.
//!
//! [`Vault`] owns the passphrase-derived master key and is the only reader
//! and writer of the records in its [`KvStore`]. Storage layout:
//!
//! - `vault/meta`: salt and KDF parameters ([`VaultMeta`])
//! - `vault/canary`: a known plaintext sealed under the master key, used to
//!   verify a passphrase even when no secrets are stored
//! - `secrets/<provider>`: one [`EncryptedSecretRecord`] per provider
//!
//! Lock ordering: `unlock_gate` before `vault_gate` before a provider lock.
//! The key slot is a synchronous lock and is never held across an await.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use gptvault_core::SecretString;
use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::{Mutex, RwLock as AsyncRwLock};
use tracing::{debug, error, info, warn};

use crate::crypto::{self, KdfParams, KeyHandle};
use crate::error::{Result, VaultError};
use crate::store::KvStore;
use crate::types::{EncryptedSecretRecord, SecretRef, VaultMeta};

pub const META_KEY: &str = "vault/meta";
pub const CANARY_KEY: &str = "vault/canary";
pub const SECRET_PREFIX: &str = "secrets/";

const CANARY_PROVIDER: &str = "vault.canary";
const CANARY_PLAINTEXT: &[u8] = b"gptvault-canary-v1";

/// Maximum allowed length for a provider id.
const MAX_PROVIDER_LEN: usize = 64;

/// Lifecycle of the vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VaultState {
    /// No passphrase has been set up.
    Uninitialized,
    /// A passphrase exists; the master key is not in memory.
    Locked,
    /// The master key is in memory.
    Unlocked,
}

struct KeySlot {
    meta: Option<VaultMeta>,
    key: Option<Arc<KeyHandle>>,
    /// Bumped on every lock; in-flight operations compare against it.
    epoch: u64,
}

/// Passphrase-protected secret store.
///
/// Construct with [`Vault::open`]; the returned value has already loaded the
/// persisted salt, so no operation can observe a half-initialized vault.
/// Intended to be created once per process and shared behind an `Arc`.
pub struct Vault {
    store: Arc<dyn KvStore>,
    kdf: KdfParams,
    slot: RwLock<KeySlot>,
    /// Queues concurrent unlock attempts.
    unlock_gate: Mutex<()>,
    /// Shared by per-record operations, exclusive for whole-vault rewrites.
    vault_gate: AsyncRwLock<()>,
    provider_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl Vault {
    /// Open the vault over `store`.
    ///
    /// `kdf` is the cost used for new passphrases; existing vaults keep the
    /// parameters recorded in their metadata.
    pub async fn open(store: Arc<dyn KvStore>, kdf: KdfParams) -> Result<Self> {
        if !crypto::is_crypto_available() {
            error!("platform cryptography unavailable");
            return Err(VaultError::CryptoUnavailable);
        }

        let meta = match store.get(META_KEY).await? {
            Some(bytes) => {
                let meta: VaultMeta =
                    serde_json::from_slice(&bytes).map_err(|e| VaultError::CorruptRecord {
                        key: META_KEY.to_string(),
                        reason: e.to_string(),
                    })?;
                meta.salt_bytes()?;
                Some(meta)
            }
            None => None,
        };

        debug!(initialized = meta.is_some(), "vault opened");
        Ok(Self {
            store,
            kdf,
            slot: RwLock::new(KeySlot {
                meta,
                key: None,
                epoch: 0,
            }),
            unlock_gate: Mutex::new(()),
            vault_gate: AsyncRwLock::new(()),
            provider_locks: DashMap::new(),
        })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> VaultState {
        let slot = self.slot.read();
        match (&slot.meta, &slot.key) {
            (None, _) => VaultState::Uninitialized,
            (Some(_), None) => VaultState::Locked,
            (Some(_), Some(_)) => VaultState::Unlocked,
        }
    }

    pub fn is_unlocked(&self) -> bool {
        self.state() == VaultState::Unlocked
    }

    /// Whether a passphrase has ever been set up. Safe to call while locked.
    pub fn has_secrets(&self) -> bool {
        self.slot.read().meta.is_some()
    }

    /// KDF cost applied to new passphrases.
    pub fn kdf_params(&self) -> KdfParams {
        self.kdf
    }

    /// Set up the first passphrase and leave the vault unlocked.
    pub async fn initialize_passphrase(&self, passphrase: &str) -> Result<()> {
        if passphrase.is_empty() {
            return Err(VaultError::InvalidPassphrase);
        }

        let _gate = self.unlock_gate.lock().await;
        let _vault = self.vault_gate.write().await;
        let epoch = {
            let slot = self.slot.read();
            if slot.meta.is_some() {
                return Err(VaultError::AlreadyInitialized);
            }
            slot.epoch
        };

        let salt = crypto::generate_salt()?;
        let key =
            crypto::derive_key_blocking(SecretString::new(passphrase), salt.clone(), self.kdf)
                .await?;
        let meta = VaultMeta::new(&salt, self.kdf);

        // Metadata goes last: its presence is what marks the vault initialized.
        self.store.put(CANARY_KEY, &seal_canary(&key)?).await?;
        self.store.put(META_KEY, &serde_json::to_vec(&meta)?).await?;

        let mut slot = self.slot.write();
        slot.meta = Some(meta);
        if slot.epoch != epoch {
            warn!("vault initialized but locked before the key was installed");
            return Err(VaultError::SessionLocked);
        }
        slot.key = Some(Arc::new(key));
        info!("vault initialized");
        Ok(())
    }

    /// Try to unlock with `passphrase`.
    ///
    /// Returns `Ok(false)` when the passphrase is wrong; the vault stays locked.
    pub async fn unlock(&self, passphrase: &str) -> Result<bool> {
        let _gate = self.unlock_gate.lock().await;
        let _vault = self.vault_gate.read().await;

        let (meta, epoch) = {
            let slot = self.slot.read();
            if slot.key.is_some() {
                return Err(VaultError::AlreadyUnlocked);
            }
            (slot.meta.clone().ok_or(VaultError::NotInitialized)?, slot.epoch)
        };

        let key =
            crypto::derive_key_blocking(SecretString::new(passphrase), meta.salt_bytes()?, meta.kdf)
                .await?;

        if !self.verify_key(&key).await? {
            warn!("unlock rejected: passphrase did not verify");
            return Ok(false);
        }

        let mut slot = self.slot.write();
        if slot.epoch != epoch {
            warn!("unlock abandoned: vault was locked while verifying");
            return Err(VaultError::SessionLocked);
        }
        slot.key = Some(Arc::new(key));
        info!("vault unlocked");
        Ok(true)
    }

    /// Check `key` against the canary.
    ///
    /// Vaults written before the canary existed are checked against their
    /// first readable secret instead, and get a canary on success.
    async fn verify_key(&self, key: &KeyHandle) -> Result<bool> {
        if let Some(bytes) = self.store.get(CANARY_KEY).await? {
            let record = parse_record(CANARY_KEY, &bytes)?;
            return opened(record.open(key, CANARY_KEY.as_bytes()));
        }

        let mut legacy_check = true;
        for storage_key in self.store.list_prefix(SECRET_PREFIX).await? {
            let Some(bytes) = self.store.get(&storage_key).await? else {
                continue;
            };
            match parse_record(&storage_key, &bytes) {
                Ok(record) => {
                    legacy_check = opened(record.open(key, storage_key.as_bytes()))?;
                    break;
                }
                Err(e) => warn!(key = %storage_key, "skipping malformed secret record: {e}"),
            }
        }

        if legacy_check {
            info!("writing passphrase canary for legacy vault");
            self.store.put(CANARY_KEY, &seal_canary(key)?).await?;
        }
        Ok(legacy_check)
    }

    /// Drop the master key. Idempotent.
    ///
    /// Also cancels any unlock, initialization, or passphrase change still in
    /// flight: they finish without installing a key.
    pub fn lock(&self) {
        let mut slot = self.slot.write();
        slot.epoch += 1;
        if slot.key.take().is_some() {
            info!("vault locked");
        }
    }

    fn current_key(&self) -> Result<(Arc<KeyHandle>, u64)> {
        let slot = self.slot.read();
        match &slot.key {
            Some(key) => Ok((Arc::clone(key), slot.epoch)),
            None => Err(VaultError::SessionLocked),
        }
    }

    /// Fail if the vault was locked since `epoch` was observed.
    fn ensure_epoch(&self, epoch: u64) -> Result<()> {
        let slot = self.slot.read();
        if slot.key.is_none() || slot.epoch != epoch {
            return Err(VaultError::SessionLocked);
        }
        Ok(())
    }

    fn provider_lock(&self, provider: &str) -> Arc<Mutex<()>> {
        self.provider_locks
            .entry(provider.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone()
    }

    /// Encrypt `plaintext` and store it as `provider`'s secret, replacing
    /// any previous value.
    pub async fn encrypt_secret(&self, provider: &str, plaintext: &str) -> Result<()> {
        validate_provider(provider)?;
        let _vault = self.vault_gate.read().await;
        let provider_lock = self.provider_lock(provider);
        let _provider = provider_lock.lock().await;

        let (key, epoch) = self.current_key()?;
        let storage_key = secret_key(provider);

        let created_at = self.existing_created_at(&storage_key).await?;
        let record = EncryptedSecretRecord::seal(
            &key,
            provider,
            storage_key.as_bytes(),
            plaintext.as_bytes(),
            created_at,
        )?;
        let bytes = serde_json::to_vec(&record)?;

        self.ensure_epoch(epoch)?;
        self.store.put(&storage_key, &bytes).await?;
        debug!(provider, "stored secret");
        Ok(())
    }

    async fn existing_created_at(&self, storage_key: &str) -> Result<Option<DateTime<Utc>>> {
        let Some(bytes) = self.store.get(storage_key).await? else {
            return Ok(None);
        };
        Ok(serde_json::from_slice::<EncryptedSecretRecord>(&bytes)
            .ok()
            .map(|r| r.created_at))
    }

    /// Decrypt `provider`'s secret. `Ok(None)` means none is stored.
    ///
    /// If the vault is locked while this is in flight the plaintext is
    /// discarded and [`VaultError::SessionLocked`] returned.
    pub async fn decrypt_secret(&self, provider: &str) -> Result<Option<SecretString>> {
        validate_provider(provider)?;
        let _vault = self.vault_gate.read().await;

        let (key, epoch) = self.current_key()?;
        let storage_key = secret_key(provider);

        let Some(bytes) = self.store.get(&storage_key).await? else {
            self.ensure_epoch(epoch)?;
            return Ok(None);
        };
        let record: EncryptedSecretRecord = serde_json::from_slice(&bytes).map_err(|e| {
            warn!(provider, error = %e, "unreadable secret record");
            VaultError::Decryption
        })?;

        let mut plaintext = record.open(&key, storage_key.as_bytes())?;
        drop(key);

        // No await between this check and the return.
        self.ensure_epoch(epoch)?;
        let secret = SecretString::from_utf8(std::mem::take(&mut *plaintext))
            .map_err(|_| VaultError::Decryption)?;
        debug!(provider, "decrypted secret");
        Ok(Some(secret))
    }

    /// Remove `provider`'s secret. Succeeds if none is stored.
    ///
    /// Needs no key material, so it is allowed while locked.
    pub async fn delete_secret(&self, provider: &str) -> Result<()> {
        validate_provider(provider)?;
        let _vault = self.vault_gate.read().await;
        let provider_lock = self.provider_lock(provider);
        let _provider = provider_lock.lock().await;

        self.store.delete(&secret_key(provider)).await?;
        debug!(provider, "deleted secret");
        Ok(())
    }

    /// Whether a record exists for `provider`. Safe to call while locked.
    pub async fn has_secret(&self, provider: &str) -> Result<bool> {
        validate_provider(provider)?;
        Ok(self.store.get(&secret_key(provider)).await?.is_some())
    }

    /// Metadata for every stored secret, sorted by provider. Safe to call
    /// while locked.
    pub async fn list_providers(&self) -> Result<Vec<SecretRef>> {
        let mut refs = Vec::new();
        for storage_key in self.store.list_prefix(SECRET_PREFIX).await? {
            let Some(bytes) = self.store.get(&storage_key).await? else {
                continue;
            };
            let Some(provider) = storage_key.strip_prefix(SECRET_PREFIX) else {
                continue;
            };
            match serde_json::from_slice::<EncryptedSecretRecord>(&bytes) {
                Ok(record) => refs.push(record.to_ref(provider)),
                Err(e) => {
                    warn!(key = %storage_key, "skipping malformed secret record: {e}");
                }
            }
        }
        refs.sort_by(|a, b| a.provider.cmp(&b.provider));
        Ok(refs)
    }

    /// Re-key the vault under `new_passphrase`.
    ///
    /// Every record is re-encrypted in memory before anything is written. If
    /// a write fails, everything already written is restored, so records
    /// never end up split across two keys.
    pub async fn change_passphrase(&self, old_passphrase: &str, new_passphrase: &str) -> Result<()> {
        if new_passphrase.is_empty() {
            return Err(VaultError::InvalidPassphrase);
        }

        let _gate = self.unlock_gate.lock().await;
        let _vault = self.vault_gate.write().await;

        let (current, epoch) = self.current_key()?;
        let meta = self
            .slot
            .read()
            .meta
            .clone()
            .ok_or(VaultError::NotInitialized)?;

        let old_key = crypto::derive_key_blocking(
            SecretString::new(old_passphrase),
            meta.salt_bytes()?,
            meta.kdf,
        )
        .await?;
        if !old_key.ct_eq(&current) {
            warn!("passphrase change rejected: current passphrase did not match");
            return Err(VaultError::InvalidPassphrase);
        }

        let new_salt = crypto::generate_salt()?;
        let new_key = crypto::derive_key_blocking(
            SecretString::new(new_passphrase),
            new_salt.clone(),
            self.kdf,
        )
        .await?;
        let new_meta = VaultMeta::new(&new_salt, self.kdf);

        // Phase 1: re-encrypt everything in memory.
        let mut writes: Vec<PlannedWrite> = Vec::new();
        for storage_key in self.store.list_prefix(SECRET_PREFIX).await? {
            let Some(previous) = self.store.get(&storage_key).await? else {
                continue;
            };
            let record = parse_record(&storage_key, &previous).map_err(|_| VaultError::Decryption)?;
            let plaintext = record.open(&current, storage_key.as_bytes())?;
            let resealed = EncryptedSecretRecord::seal(
                &new_key,
                &record.provider,
                storage_key.as_bytes(),
                &plaintext,
                Some(record.created_at),
            )?;
            writes.push(PlannedWrite {
                next: serde_json::to_vec(&resealed)?,
                previous: Some(previous),
                key: storage_key,
            });
        }
        let record_count = writes.len();
        writes.push(PlannedWrite {
            previous: self.store.get(CANARY_KEY).await?,
            next: seal_canary(&new_key)?,
            key: CANARY_KEY.to_string(),
        });
        writes.push(PlannedWrite {
            previous: self.store.get(META_KEY).await?,
            next: serde_json::to_vec(&new_meta)?,
            key: META_KEY.to_string(),
        });

        self.ensure_epoch(epoch)?;

        // Phase 2: write, restoring on failure.
        for (done, write) in writes.iter().enumerate() {
            if let Err(e) = self.store.put(&write.key, &write.next).await {
                error!(key = %write.key, "passphrase change failed, rolling back");
                self.roll_back(&writes[..done]).await?;
                return Err(e);
            }
        }

        // The store now holds the new salt whether or not the key survives.
        let mut slot = self.slot.write();
        slot.meta = Some(new_meta);
        if slot.epoch != epoch {
            warn!(records = record_count, "passphrase changed but vault was locked meanwhile");
            return Err(VaultError::SessionLocked);
        }
        slot.key = Some(Arc::new(new_key));
        info!(records = record_count, "passphrase changed");
        Ok(())
    }

    async fn roll_back(&self, written: &[PlannedWrite]) -> Result<()> {
        let mut failures = 0usize;
        for write in written.iter().rev() {
            let restored = match &write.previous {
                Some(previous) => self.store.put(&write.key, previous).await,
                None => self.store.delete(&write.key).await,
            };
            if let Err(e) = restored {
                failures += 1;
                error!(key = %write.key, "rollback write failed: {e}");
            }
        }
        if failures > 0 {
            return Err(VaultError::Storage(format!(
                "rollback incomplete: {failures} record(s) could not be restored"
            )));
        }
        Ok(())
    }

    /// Delete every secret, the canary, and the salt. Irreversible.
    pub async fn reset_all(&self) -> Result<()> {
        let _gate = self.unlock_gate.lock().await;
        let _vault = self.vault_gate.write().await;

        let keys = self.store.list_prefix(SECRET_PREFIX).await?;
        for storage_key in &keys {
            self.store.delete(storage_key).await?;
        }
        self.store.delete(CANARY_KEY).await?;
        self.store.delete(META_KEY).await?;

        {
            let mut slot = self.slot.write();
            slot.meta = None;
            slot.key = None;
            slot.epoch += 1;
        }
        self.provider_locks.clear();
        info!(records = keys.len(), "vault reset");
        Ok(())
    }
}

struct PlannedWrite {
    key: String,
    previous: Option<Vec<u8>>,
    next: Vec<u8>,
}

fn secret_key(provider: &str) -> String {
    format!("{SECRET_PREFIX}{provider}")
}

fn seal_canary(key: &KeyHandle) -> Result<Vec<u8>> {
    let record = EncryptedSecretRecord::seal(
        key,
        CANARY_PROVIDER,
        CANARY_KEY.as_bytes(),
        CANARY_PLAINTEXT,
        None,
    )?;
    Ok(serde_json::to_vec(&record)?)
}

fn parse_record(storage_key: &str, bytes: &[u8]) -> Result<EncryptedSecretRecord> {
    serde_json::from_slice(bytes).map_err(|e| VaultError::CorruptRecord {
        key: storage_key.to_string(),
        reason: e.to_string(),
    })
}

/// Map an open attempt to a verification outcome.
fn opened<T>(result: Result<T>) -> Result<bool> {
    match result {
        Ok(_) => Ok(true),
        Err(VaultError::Decryption) => Ok(false),
        Err(e) => Err(e),
    }
}

/// Validate a provider id.
///
/// Allowed: ASCII alphanumeric, `_`, `-`, `.`; must not start with `.`;
/// at most 64 characters.
pub fn validate_provider(provider: &str) -> Result<()> {
    if provider.is_empty() {
        return Err(VaultError::InvalidProvider(
            "provider must not be empty".to_string(),
        ));
    }
    if provider.len() > MAX_PROVIDER_LEN {
        return Err(VaultError::InvalidProvider(format!(
            "provider exceeds maximum length of {MAX_PROVIDER_LEN} characters"
        )));
    }
    if provider.starts_with('.')
        || !provider
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
    {
        return Err(VaultError::InvalidProvider(format!(
            "provider contains invalid characters (allowed: alphanumeric, underscore, hyphen, dot): {provider}"
        )));
    }
    Ok(())
}
