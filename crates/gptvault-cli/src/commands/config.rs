//! Configuration management commands.

use std::path::Path;

use clap::Args;
use gptvault_session::SessionConfigUpdate;

use super::{config_path, load_config, open_context};

/// Config command arguments.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(clap::Subcommand)]
pub enum ConfigCommand {
    /// Show configuration and the vault's active session bounds
    Show,

    /// Show configuration file path
    Path,

    /// Validate configuration
    Validate,

    /// Change the session inactivity bounds stored in the vault
    Session {
        /// Minutes of inactivity before the session locks
        #[arg(long)]
        timeout: Option<u32>,

        /// Minutes before the lock at which the warning starts
        #[arg(long)]
        warning: Option<u32>,
    },
}

/// Run the config command.
pub async fn run(args: ConfigArgs, config: Option<&Path>) -> anyhow::Result<()> {
    match args.command {
        ConfigCommand::Show => {
            let cfg = load_config(config)?;
            println!("{}", cfg.to_json5()?);

            let ctx = open_context(&cfg).await?;
            let session = ctx.session_config();
            println!(
                "\nActive session bounds: timeout {} min, warning {} min",
                session.timeout_minutes, session.warning_minutes
            );
        }

        ConfigCommand::Path => {
            println!("{}", config_path(config)?.display());
        }

        ConfigCommand::Validate => {
            load_config(config)?;
            println!("Configuration is valid.");
        }

        ConfigCommand::Session { timeout, warning } => {
            if timeout.is_none() && warning.is_none() {
                anyhow::bail!("Nothing to change. Pass --timeout and/or --warning.");
            }

            let cfg = load_config(config)?;
            let ctx = open_context(&cfg).await?;
            let updated = ctx
                .update_session_config(SessionConfigUpdate {
                    timeout_minutes: timeout,
                    warning_minutes: warning,
                })
                .await?;

            println!(
                "Session bounds set: timeout {} min, warning {} min",
                updated.timeout_minutes, updated.warning_minutes
            );
        }
    }

    Ok(())
}
