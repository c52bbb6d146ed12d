//! Nimbus CLI main entry point

use anyhow::Result;
use clap::Parser;
use nimbus_cli::commands::{Cli, CommandExecutor};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose && std::env::var("RUST_LOG").is_err() {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut executor = CommandExecutor::new();
    let result = executor.execute(cli.command).await?;

    if !result.message.is_empty() {
        eprintln!("{}", result.message);
    }

    // Exit with appropriate code
    if result.success {
        std::process::exit(0);
    } else {
        std::process::exit(1);
    }
}
