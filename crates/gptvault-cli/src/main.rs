//! GPTVault CLI entry point.

use clap::Parser;
use gptvault_cli::{log_directive, run, Cli};
use gptvault_core::env::{self, vars};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging. Output goes to stderr so stdout stays scriptable.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_directive(&cli)));
    let registry = tracing_subscriber::registry().with(filter);
    if env::get_bool(vars::GPTVAULT_LOG_JSON) {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    run(cli).await
}
