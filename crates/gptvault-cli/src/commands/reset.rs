//! `gptvault reset`: irreversible wipe.

use std::path::Path;

use clap::Args;

use super::{load_config, open_context};

/// Reset command arguments.
#[derive(Args)]
pub struct ResetArgs {
    /// Confirm that every stored secret should be destroyed
    #[arg(long)]
    pub yes: bool,
}

/// Run the reset command.
pub async fn run(args: ResetArgs, config: Option<&Path>) -> anyhow::Result<()> {
    if !args.yes {
        anyhow::bail!("This deletes every stored secret and the passphrase. Re-run with --yes to confirm.");
    }

    let cfg = load_config(config)?;
    let ctx = open_context(&cfg).await?;
    let count = ctx.list_providers().await?.len();
    ctx.reset_all_data().await?;

    println!("Vault reset. {} secret(s) deleted.", count);
    Ok(())
}
