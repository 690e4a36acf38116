//! `gptvault init`: first-time passphrase setup.

use std::path::Path;

use clap::Args;
use gptvault_core::env::{self, vars};
use gptvault_core::{paths, SecretString};

use super::{config_path, load_config, open_context, read_new_passphrase};

/// Init command arguments.
#[derive(Args)]
pub struct InitArgs {
    /// Also write a default config file if none exists
    #[arg(long)]
    pub write_config: bool,
}

/// Run the init command.
pub async fn run(args: InitArgs, config: Option<&Path>) -> anyhow::Result<()> {
    let path = config_path(config)?;
    let cfg = load_config(config)?;

    if args.write_config && !path.exists() {
        paths::ensure_base_dir()?;
        cfg.save(&path)?;
        println!("Created config file: {}", path.display());
    }

    let ctx = open_context(&cfg).await?;
    if ctx.has_secrets() {
        anyhow::bail!(
            "Vault is already initialized. Use 'gptvault passphrase change' or 'gptvault reset --yes'."
        );
    }

    let passphrase = match env::get_var(vars::GPTVAULT_PASSPHRASE) {
        Some(passphrase) => SecretString::new(passphrase),
        None => read_new_passphrase("New vault passphrase: ")?,
    };
    ctx.set_initial_passphrase(passphrase.expose_secret()).await?;
    ctx.lock();

    println!("Vault initialized at {}", cfg.vault_dir()?.display());
    Ok(())
}
