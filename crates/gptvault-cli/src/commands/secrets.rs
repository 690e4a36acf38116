//! Secret management commands.
//!
//! Provides `gptvault secrets set|get|list|delete`. Everything except
//! `list` unlocks the vault for the duration of the command.

use std::path::Path;

use clap::Args;
use gptvault_core::SecretString;

use super::{load_config, open_context, unlock};

/// Secrets command arguments.
#[derive(Args)]
pub struct SecretsArgs {
    #[command(subcommand)]
    pub command: SecretsCommand,
}

#[derive(clap::Subcommand)]
pub enum SecretsCommand {
    /// Store a provider's API key (prompts for value)
    Set {
        /// Provider id (alphanumeric, underscore, hyphen, dot)
        provider: String,

        /// Secret value (if omitted, prompts for hidden input)
        #[arg(long)]
        value: Option<String>,
    },

    /// Retrieve and print a decrypted secret
    Get {
        /// Provider id
        provider: String,
    },

    /// List stored providers (metadata only, no unlock needed)
    List,

    /// Delete a provider's secret
    Delete {
        /// Provider id
        provider: String,
    },
}

/// Run the secrets command.
pub async fn run(args: SecretsArgs, config: Option<&Path>) -> anyhow::Result<()> {
    let cfg = load_config(config)?;
    let ctx = open_context(&cfg).await?;

    match args.command {
        SecretsCommand::Set { provider, value } => {
            let secret = match value {
                Some(v) => SecretString::new(v),
                None => {
                    let prompt = format!("Enter API key for '{provider}': ");
                    SecretString::new(
                        rpassword::prompt_password(prompt)
                            .map_err(|e| anyhow::anyhow!("Failed to read secret: {}", e))?,
                    )
                }
            };

            if secret.is_empty() {
                anyhow::bail!("Secret value must not be empty");
            }

            unlock(&ctx).await?;
            ctx.set_secret(&provider, secret.expose_secret()).await?;
            println!("Secret for '{}' stored successfully.", provider);
        }

        SecretsCommand::Get { provider } => {
            unlock(&ctx).await?;
            match ctx.get_secret(&provider).await {
                Ok(Some(secret)) => println!("{}", secret.expose_secret()),
                Ok(None) => anyhow::bail!("No secret stored for '{}'", provider),
                Err(e) if e.is_decryption_failure() => anyhow::bail!(
                    "Secret for '{}' could not be decrypted. Remove it with 'gptvault secrets delete {}'.",
                    provider,
                    provider
                ),
                Err(e) => return Err(e.into()),
            }
        }

        SecretsCommand::List => {
            let refs = ctx.list_providers().await?;

            if refs.is_empty() {
                println!("No secrets stored.");
            } else {
                println!("{:<32} {:<24} {}", "PROVIDER", "CREATED", "UPDATED");
                println!("{}", "-".repeat(80));
                for r in &refs {
                    println!(
                        "{:<32} {:<24} {}",
                        r.provider,
                        r.created_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
                        r.updated_at.format("%Y-%m-%d %H:%M:%S UTC")
                    );
                }
                println!("\n{} secret(s) total.", refs.len());
            }
        }

        SecretsCommand::Delete { provider } => {
            unlock(&ctx).await?;
            ctx.delete_secret(&provider).await?;
            println!("Secret for '{}' deleted.", provider);
        }
    }

    ctx.lock();
    Ok(())
}
