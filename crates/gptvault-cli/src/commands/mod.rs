//! CLI command implementations.

pub mod config;
pub mod doctor;
pub mod init;
pub mod passphrase;
pub mod reset;
pub mod secrets;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use gptvault_context::{ContextOptions, VaultContext};
use gptvault_core::env::{self, vars};
use gptvault_core::{Config, SecretString};
use gptvault_secrets::FileStore;

/// Resolve the config file: explicit path, else the default location.
pub fn config_path(explicit: Option<&Path>) -> anyhow::Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => Ok(Config::default_path()?),
    }
}

/// Load and validate the config, using defaults when no file exists.
pub fn load_config(explicit: Option<&Path>) -> anyhow::Result<Config> {
    let path = config_path(explicit)?;
    Config::load_or_default(&path)
        .with_context(|| format!("Failed to load config from {}", path.display()))
}

/// Open the vault described by `config`.
pub async fn open_context(config: &Config) -> anyhow::Result<VaultContext> {
    let dir = config.vault_dir()?;
    let store = FileStore::new(&dir);
    VaultContext::open(Arc::new(store), ContextOptions::from_config(config))
        .await
        .with_context(|| format!("Failed to open vault at {}", dir.display()))
}

/// Read a passphrase, preferring `$GPTVAULT_PASSPHRASE` over a prompt.
pub fn read_passphrase(prompt: &str) -> anyhow::Result<SecretString> {
    if let Some(passphrase) = env::get_var(vars::GPTVAULT_PASSPHRASE) {
        return Ok(SecretString::new(passphrase));
    }
    let passphrase = rpassword::prompt_password(prompt).context("Failed to read passphrase")?;
    Ok(SecretString::new(passphrase))
}

/// Prompt twice for a new passphrase and require both entries to match.
pub fn read_new_passphrase(prompt: &str) -> anyhow::Result<SecretString> {
    let first = SecretString::new(
        rpassword::prompt_password(prompt).context("Failed to read passphrase")?,
    );
    if first.is_empty() {
        anyhow::bail!("Passphrase must not be empty");
    }
    let second = SecretString::new(
        rpassword::prompt_password("Confirm passphrase: ").context("Failed to read passphrase")?,
    );
    if first != second {
        anyhow::bail!("Passphrases do not match");
    }
    Ok(first)
}

/// Unlock `ctx`, failing with a readable message on a wrong passphrase.
pub async fn unlock(ctx: &VaultContext) -> anyhow::Result<()> {
    if !ctx.has_secrets() {
        anyhow::bail!("Vault is not initialized. Run 'gptvault init' first.");
    }
    let passphrase = read_passphrase("Vault passphrase: ")?;
    if !ctx.unlock(passphrase.expose_secret()).await? {
        anyhow::bail!("Incorrect passphrase");
    }
    Ok(())
}
