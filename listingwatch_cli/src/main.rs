mod commands;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use listingwatch_lib::DEFAULT_CONFIG_PATH;

#[derive(Parser)]
#[command(name = "listingwatch")]
#[command(about = "Watch a marketplace search for new listings and send notifications")]
struct Cli {
    /// Path to the TOML config file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH, global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run now, then repeat on the configured interval (default)
    Watch,
    /// Run once and print the new listings
    Once(commands::once::OnceArgs),
    /// Send a test message to every configured recipient
    TestNotify,
    /// Validate the config file and print the effective settings
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("listingwatch=info".parse().unwrap()),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Watch) {
        Commands::Watch => commands::watch::run(&cli.config).await?,
        Commands::Once(args) => commands::once::run(&args, &cli.config).await?,
        Commands::TestNotify => commands::test_notify::run(&cli.config).await?,
        Commands::CheckConfig => commands::check_config::run(&cli.config)?,
    }

    Ok(())
}
