//! Regmirror CLI - mirrors container images into a local registry.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so `--output json` stays machine-readable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "regmirror=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Mirror(args) => commands::mirror::execute(args).await,
        Commands::Resolve(args) => commands::resolve::run(&args),
        Commands::Version => {
            println!("regmirror {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
