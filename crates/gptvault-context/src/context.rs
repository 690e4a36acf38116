//! [`VaultContext`]: permission checks and auto-lock coordination between
//! the vault and the session.

use std::sync::Arc;

use gptvault_core::{Config, SessionConfig, SecretString};
use gptvault_secrets::{is_crypto_available, KdfParams, KvStore, SecretRef, Vault, VaultState};
use gptvault_session::{
    SessionConfigUpdate, SessionManager, SessionState, SessionStatus, Subscription,
};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::{ContextError, Result};

/// Storage key of the persisted session bounds.
pub const SETTINGS_KEY: &str = "settings/session";

/// Construction options for [`VaultContext`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextOptions {
    /// Session bounds used when none are persisted.
    pub session: SessionConfig,
    /// KDF cost for new passphrases.
    pub kdf: KdfParams,
}

impl ContextOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            session: config.session,
            kdf: config.kdf.into(),
        }
    }

    pub fn with_kdf(mut self, kdf: KdfParams) -> Self {
        self.kdf = kdf;
        self
    }

    pub fn with_session(mut self, session: SessionConfig) -> Self {
        self.session = session;
        self
    }
}

/// Vault plus session, exposed as one API.
///
/// One per process. Every secret operation checks the session first; the
/// vault is locked the moment the session reports `locked`, whether that
/// came from [`lock`](Self::lock) or from the inactivity timer.
pub struct VaultContext {
    vault: Arc<Vault>,
    store: Arc<dyn KvStore>,
    session: SessionManager,
    defaults: SessionConfig,
    _auto_lock: Subscription,
}

impl VaultContext {
    /// Open the vault over `store` and restore the persisted session bounds.
    pub async fn open(store: Arc<dyn KvStore>, options: ContextOptions) -> Result<Self> {
        let vault = Arc::new(Vault::open(Arc::clone(&store), options.kdf).await?);
        let config = load_settings(store.as_ref(), options.session).await?;
        let session = SessionManager::new(config)?;

        let auto_lock = {
            let vault = Arc::clone(&vault);
            session.subscribe(move |state| {
                if state.status == SessionStatus::Locked {
                    vault.lock();
                }
            })
        };

        debug!(
            timeout_minutes = config.timeout_minutes,
            warning_minutes = config.warning_minutes,
            "vault context ready"
        );
        Ok(Self {
            vault,
            store,
            session,
            defaults: options.session,
            _auto_lock: auto_lock,
        })
    }

    fn ensure_active(&self) -> Result<()> {
        if self.session.status().is_active() && self.vault.is_unlocked() {
            Ok(())
        } else {
            Err(ContextError::SessionLocked)
        }
    }

    fn start_session(&self) -> Result<()> {
        if let Err(e) = self.session.unlock() {
            self.vault.lock();
            return Err(e.into());
        }
        self.session.start_activity_tracking();
        Ok(())
    }

    /// Set up the first passphrase and start an unlocked session.
    pub async fn set_initial_passphrase(&self, passphrase: &str) -> Result<()> {
        self.vault.initialize_passphrase(passphrase).await?;
        self.start_session()
    }

    /// Unlock the vault and start a session. `Ok(false)` on a wrong passphrase.
    pub async fn unlock(&self, passphrase: &str) -> Result<bool> {
        if !self.vault.unlock(passphrase).await? {
            return Ok(false);
        }
        self.start_session()?;
        Ok(true)
    }

    /// End the session and drop the key. Idempotent.
    pub fn lock(&self) {
        self.session.stop_activity_tracking();
        self.session.lock();
        self.vault.lock();
    }

    /// Restart the inactivity countdown. Returns whether a session was running.
    pub fn extend_session(&self) -> bool {
        self.session.extend_session()
    }

    /// Report user activity.
    pub fn record_activity(&self) -> bool {
        self.session.record_activity()
    }

    pub async fn change_passphrase(&self, old_passphrase: &str, new_passphrase: &str) -> Result<()> {
        self.ensure_active()?;
        self.vault
            .change_passphrase(old_passphrase, new_passphrase)
            .await?;
        Ok(())
    }

    /// Decrypt `provider`'s secret. `Ok(None)` when none is configured.
    ///
    /// A record that fails to decrypt surfaces as an error for which
    /// [`ContextError::is_decryption_failure`] is true; the session stays up.
    pub async fn get_secret(&self, provider: &str) -> Result<Option<SecretString>> {
        self.ensure_active()?;
        let secret = self.vault.decrypt_secret(provider).await?;
        if !self.session.status().is_active() {
            debug!(provider, "session locked during decrypt, discarding result");
            return Err(ContextError::SessionLocked);
        }
        Ok(secret)
    }

    pub async fn set_secret(&self, provider: &str, value: &str) -> Result<()> {
        self.ensure_active()?;
        self.vault.encrypt_secret(provider, value).await?;
        Ok(())
    }

    pub async fn delete_secret(&self, provider: &str) -> Result<()> {
        self.ensure_active()?;
        self.vault.delete_secret(provider).await?;
        Ok(())
    }

    /// Stored providers, metadata only. Works while locked.
    pub async fn list_providers(&self) -> Result<Vec<SecretRef>> {
        Ok(self.vault.list_providers().await?)
    }

    pub async fn has_secret(&self, provider: &str) -> Result<bool> {
        Ok(self.vault.has_secret(provider).await?)
    }

    /// Whether a passphrase has been set up.
    pub fn has_secrets(&self) -> bool {
        self.vault.has_secrets()
    }

    pub fn is_crypto_available(&self) -> bool {
        is_crypto_available()
    }

    pub fn vault_state(&self) -> VaultState {
        self.vault.state()
    }

    pub fn session_config(&self) -> SessionConfig {
        self.session.get_config()
    }

    /// Apply and persist new session bounds.
    ///
    /// If the bounds cannot be persisted the previous ones are restored.
    pub async fn update_session_config(&self, update: SessionConfigUpdate) -> Result<SessionConfig> {
        let previous = self.session.get_config();
        let config = self.session.set_config(update)?;

        if let Err(e) = save_settings(self.store.as_ref(), &config).await {
            warn!("failed to persist session config, restoring previous bounds");
            self.session.set_config(previous.into())?;
            return Err(e);
        }
        Ok(config)
    }

    /// Delete every secret, the passphrase salt, and the saved session
    /// bounds. Irreversible; confirmation is the caller's job.
    pub async fn reset_all_data(&self) -> Result<()> {
        self.lock();
        self.vault.reset_all().await?;
        self.store.delete(SETTINGS_KEY).await?;
        self.session.set_config(self.defaults.into())?;
        info!("all vault data reset");
        Ok(())
    }

    pub fn status(&self) -> SessionStatus {
        self.session.status()
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    pub fn remaining_seconds(&self) -> Option<u64> {
        self.session.remaining_seconds()
    }

    /// See [`SessionManager::subscribe`].
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&SessionState) + Send + Sync + 'static,
    {
        self.session.subscribe(callback)
    }

    pub fn watch(&self) -> watch::Receiver<SessionState> {
        self.session.watch()
    }

    /// The underlying session handle.
    pub fn session(&self) -> &SessionManager {
        &self.session
    }
}

async fn load_settings(store: &dyn KvStore, fallback: SessionConfig) -> Result<SessionConfig> {
    let Some(bytes) = store.get(SETTINGS_KEY).await? else {
        return Ok(fallback);
    };
    match serde_json::from_slice::<SessionConfig>(&bytes) {
        Ok(config) if config.problems().is_empty() => Ok(config),
        Ok(config) => {
            warn!(problems = %config.problems().join("; "), "ignoring invalid saved session config");
            Ok(fallback)
        }
        Err(e) => {
            warn!("ignoring unreadable saved session config: {e}");
            Ok(fallback)
        }
    }
}

async fn save_settings(store: &dyn KvStore, config: &SessionConfig) -> Result<()> {
    let bytes = serde_json::to_vec(config).map_err(gptvault_secrets::VaultError::from)?;
    store.put(SETTINGS_KEY, &bytes).await?;
    Ok(())
}
