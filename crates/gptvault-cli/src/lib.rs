//! GPTVault command-line interface.

pub mod commands;

use clap::{Parser, Subcommand};
use gptvault_core::LogLevel;

/// GPTVault - passphrase-protected storage for provider API keys
#[derive(Parser)]
#[command(name = "gptvault")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Path to config file
    #[arg(short, long, env = "GPTVAULT_CONFIG")]
    pub config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Set up the vault passphrase
    Init(commands::init::InitArgs),

    /// Manage encrypted provider secrets
    Secrets(commands::secrets::SecretsArgs),

    /// Manage the vault passphrase
    Passphrase(commands::passphrase::PassphraseArgs),

    /// Delete every secret and the passphrase
    Reset(commands::reset::ResetArgs),

    /// Configuration management
    Config(commands::config::ConfigArgs),

    /// Run diagnostics
    Doctor,

    /// Show version information
    Version,
}

/// Run the CLI with the given arguments.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Init(args) => commands::init::run(args, config_path).await,
        Commands::Secrets(args) => commands::secrets::run(args, config_path).await,
        Commands::Passphrase(args) => commands::passphrase::run(args, config_path).await,
        Commands::Reset(args) => commands::reset::run(args, config_path).await,
        Commands::Config(args) => commands::config::run(args, config_path).await,
        Commands::Doctor => commands::doctor::run(config_path).await,
        Commands::Version => {
            println!("gptvault {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Default `EnvFilter` directive: `-v` flags win over the configured level.
pub fn log_directive(cli: &Cli) -> String {
    let level = match cli.verbose {
        0 => commands::load_config(cli.config.as_deref())
            .map(|config| config.logging.level)
            .unwrap_or_default(),
        1 => LogLevel::Debug,
        _ => LogLevel::Trace,
    };
    format!("gptvault={}", level.as_directive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_parse_version() {
        let cli = Cli::try_parse_from(["gptvault", "version"]).unwrap();
        assert!(matches!(cli.command, Commands::Version));
    }

    #[test]
    fn test_parse_secrets_set_with_value() {
        let cli =
            Cli::try_parse_from(["gptvault", "secrets", "set", "openai", "--value", "sk-x"]).unwrap();
        match cli.command {
            Commands::Secrets(args) => match args.command {
                commands::secrets::SecretsCommand::Set { provider, value } => {
                    assert_eq!(provider, "openai");
                    assert_eq!(value.as_deref(), Some("sk-x"));
                }
                _ => panic!("Expected Secrets Set command"),
            },
            _ => panic!("Expected Secrets command"),
        }
    }

    #[test]
    fn test_parse_secrets_list() {
        let cli = Cli::try_parse_from(["gptvault", "secrets", "list"]).unwrap();
        match cli.command {
            Commands::Secrets(args) => {
                assert!(matches!(args.command, commands::secrets::SecretsCommand::List));
            }
            _ => panic!("Expected Secrets command"),
        }
    }

    #[test]
    fn test_parse_passphrase_change() {
        let cli = Cli::try_parse_from(["gptvault", "passphrase", "change"]).unwrap();
        match cli.command {
            Commands::Passphrase(args) => {
                assert!(matches!(
                    args.command,
                    commands::passphrase::PassphraseCommand::Change
                ));
            }
            _ => panic!("Expected Passphrase command"),
        }
    }

    #[test]
    fn test_parse_reset_requires_flag_value() {
        let cli = Cli::try_parse_from(["gptvault", "reset"]).unwrap();
        match cli.command {
            Commands::Reset(args) => assert!(!args.yes),
            _ => panic!("Expected Reset command"),
        }

        let cli = Cli::try_parse_from(["gptvault", "reset", "--yes"]).unwrap();
        match cli.command {
            Commands::Reset(args) => assert!(args.yes),
            _ => panic!("Expected Reset command"),
        }
    }

    #[test]
    fn test_parse_config_session() {
        let cli = Cli::try_parse_from([
            "gptvault", "config", "session", "--timeout", "45", "--warning", "10",
        ])
        .unwrap();
        match cli.command {
            Commands::Config(args) => match args.command {
                commands::config::ConfigCommand::Session { timeout, warning } => {
                    assert_eq!(timeout, Some(45));
                    assert_eq!(warning, Some(10));
                }
                _ => panic!("Expected Config Session command"),
            },
            _ => panic!("Expected Config command"),
        }
    }

    #[test]
    fn test_parse_verbose_and_config() {
        let cli = Cli::try_parse_from(["gptvault", "-vv", "-c", "/tmp/g.json5", "doctor"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.config.as_deref(), Some(std::path::Path::new("/tmp/g.json5")));
        assert!(matches!(cli.command, Commands::Doctor));
        assert_eq!(log_directive(&cli), "gptvault=trace");
    }

    #[test]
    fn test_parse_rejects_unknown_command() {
        assert!(Cli::try_parse_from(["gptvault", "gateway"]).is_err());
    }
}
