//! Diagnostic commands.

use std::path::Path;

use console::{style, Emoji};
use gptvault_core::env::{self, vars};
use gptvault_core::{paths, ConfigError};
use gptvault_secrets::is_crypto_available;

use super::{config_path, open_context};

static CHECK: Emoji = Emoji("✓", "+");
static CROSS: Emoji = Emoji("✗", "x");
static WARN: Emoji = Emoji("⚠", "!");

/// Run the doctor command.
pub async fn run(config: Option<&Path>) -> anyhow::Result<()> {
    println!("GPTVault Doctor\n");

    let mut errors = 0;
    let mut warnings = 0;

    // Check platform crypto
    println!("Checking cryptography...");

    if is_crypto_available() {
        println!("  {} Secure random source available", style(CHECK).green());
    } else {
        println!("  {} Secure random source unavailable", style(CROSS).red());
        errors += 1;
    }

    // Check directories
    println!("\nChecking directories...");

    match paths::base_dir() {
        Ok(dir) => {
            if dir.exists() {
                println!("  {} Base directory exists: {:?}", style(CHECK).green(), dir);
            } else {
                println!("  {} Base directory missing: {:?}", style(WARN).yellow(), dir);
                warnings += 1;
            }
        }
        Err(e) => {
            println!("  {} Failed to determine base directory: {}", style(CROSS).red(), e);
            errors += 1;
        }
    }

    // Check config
    println!("\nChecking configuration...");

    let path = config_path(config)?;
    let cfg = match gptvault_core::Config::load(&path) {
        Ok(cfg) => match cfg.validate() {
            Ok(()) => {
                println!("  {} Configuration valid: {:?}", style(CHECK).green(), path);
                Some(cfg)
            }
            Err(e) => {
                println!("  {} Configuration invalid: {}", style(CROSS).red(), e);
                errors += 1;
                None
            }
        },
        Err(ConfigError::NotFound(_)) => {
            println!("  {} Configuration file not found, using defaults", style(WARN).yellow());
            println!("    Run 'gptvault init --write-config' to create one");
            warnings += 1;
            Some(gptvault_core::Config::default())
        }
        Err(e) => {
            println!("  {} Configuration error: {}", style(CROSS).red(), e);
            errors += 1;
            None
        }
    };

    if env::get_var(vars::GPTVAULT_PASSPHRASE).is_some() {
        println!(
            "  {} {} is set; the passphrase is readable by this process environment",
            style(WARN).yellow(),
            vars::GPTVAULT_PASSPHRASE
        );
        warnings += 1;
    }

    // Check vault
    if let Some(cfg) = cfg {
        println!("\nChecking vault...");

        match open_context(&cfg).await {
            Ok(ctx) => {
                if ctx.has_secrets() {
                    let count = ctx.list_providers().await.map(|r| r.len()).unwrap_or(0);
                    println!(
                        "  {} Vault initialized, {} secret(s) stored",
                        style(CHECK).green(),
                        count
                    );
                } else {
                    println!("  {} Vault not initialized", style(WARN).yellow());
                    println!("    Run 'gptvault init' to set a passphrase");
                    warnings += 1;
                }

                let session = ctx.session_config();
                println!(
                    "  {} Session locks after {} min ({} min warning)",
                    style(CHECK).green(),
                    session.timeout_minutes,
                    session.warning_minutes
                );
            }
            Err(e) => {
                println!("  {} Vault error: {:#}", style(CROSS).red(), e);
                errors += 1;
            }
        }
    }

    // Summary
    println!("\n{}", style("Summary").bold());
    println!("  Errors: {}", if errors > 0 { style(errors).red() } else { style(errors).green() });
    println!("  Warnings: {}", if warnings > 0 { style(warnings).yellow() } else { style(warnings).green() });

    if errors > 0 {
        anyhow::bail!("{} error(s) found", errors);
    }

    Ok(())
}
