//! `gptvault passphrase change`.

use std::path::Path;

use clap::Args;

use super::{load_config, open_context, read_new_passphrase, read_passphrase};

/// Passphrase command arguments.
#[derive(Args)]
pub struct PassphraseArgs {
    #[command(subcommand)]
    pub command: PassphraseCommand,
}

#[derive(clap::Subcommand)]
pub enum PassphraseCommand {
    /// Re-encrypt every secret under a new passphrase
    Change,
}

/// Run the passphrase command.
pub async fn run(args: PassphraseArgs, config: Option<&Path>) -> anyhow::Result<()> {
    let cfg = load_config(config)?;
    let ctx = open_context(&cfg).await?;

    match args.command {
        PassphraseCommand::Change => {
            if !ctx.has_secrets() {
                anyhow::bail!("Vault is not initialized. Run 'gptvault init' first.");
            }

            let current = read_passphrase("Current passphrase: ")?;
            if !ctx.unlock(current.expose_secret()).await? {
                anyhow::bail!("Incorrect passphrase");
            }

            let new = read_new_passphrase("New passphrase: ")?;
            ctx.change_passphrase(current.expose_secret(), new.expose_secret())
                .await?;
            ctx.lock();

            let count = ctx.list_providers().await?.len();
            println!("Passphrase changed. {} secret(s) re-encrypted.", count);
        }
    }

    Ok(())
}
