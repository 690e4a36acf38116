//! In-process CLI command flow.
//!
//! Runs as a single test because the passphrase comes from a process-wide
//! environment variable.

use clap::Parser;
use gptvault_cli::{run, Cli};
use gptvault_core::env::vars;
use gptvault_integration_tests::{file_context, write_test_config};
use tempfile::TempDir;

async fn gptvault(config: &std::path::Path, args: &[&str]) -> anyhow::Result<()> {
    let mut argv = vec!["gptvault", "-c", config.to_str().unwrap()];
    argv.extend_from_slice(args);
    run(Cli::try_parse_from(argv).unwrap()).await
}

#[tokio::test]
async fn test_cli_secret_lifecycle() {
    let root = TempDir::new().unwrap();
    let config = write_test_config(root.path());
    let vault_dir = root.path().join("vault");
    std::env::set_var(vars::GPTVAULT_HOME, root.path());
    std::env::set_var(vars::GPTVAULT_PASSPHRASE, "cli passphrase");

    gptvault(&config, &["init"]).await.unwrap();
    assert!(gptvault(&config, &["init"]).await.is_err());

    gptvault(&config, &["secrets", "set", "openai", "--value", "sk-cli"])
        .await
        .unwrap();
    gptvault(&config, &["secrets", "get", "openai"]).await.unwrap();
    gptvault(&config, &["secrets", "list"]).await.unwrap();
    assert!(gptvault(&config, &["secrets", "get", "anthropic"]).await.is_err());
    assert!(gptvault(&config, &["secrets", "set", "bad/name", "--value", "x"])
        .await
        .is_err());

    let ctx = file_context(&vault_dir).await;
    assert!(ctx.unlock("cli passphrase").await.unwrap());
    assert_eq!(
        ctx.get_secret("openai").await.unwrap().unwrap().expose_secret(),
        "sk-cli"
    );
    drop(ctx);

    std::env::set_var(vars::GPTVAULT_PASSPHRASE, "not the passphrase");
    let err = gptvault(&config, &["secrets", "get", "openai"]).await.unwrap_err();
    assert!(err.to_string().contains("Incorrect passphrase"));
    std::env::set_var(vars::GPTVAULT_PASSPHRASE, "cli passphrase");

    gptvault(&config, &["config", "session", "--timeout", "15", "--warning", "3"])
        .await
        .unwrap();
    assert!(gptvault(&config, &["config", "session", "--warning", "20"])
        .await
        .is_err());
    let ctx = file_context(&vault_dir).await;
    assert_eq!(ctx.session_config().timeout_minutes, 15);
    drop(ctx);

    gptvault(&config, &["secrets", "delete", "openai"]).await.unwrap();
    assert!(gptvault(&config, &["reset"]).await.is_err());
    gptvault(&config, &["reset", "--yes"]).await.unwrap();

    let ctx = file_context(&vault_dir).await;
    assert!(!ctx.has_secrets());
    assert_eq!(ctx.session_config().timeout_minutes, 30);

    std::env::remove_var(vars::GPTVAULT_PASSPHRASE);
}
