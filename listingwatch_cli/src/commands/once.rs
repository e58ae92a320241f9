//! The `once` subcommand: a single run, printing what was new.

use std::path::Path;

use anyhow::Result;
use clap::Args;
use listingwatch_lib::Watcher;

use crate::output::{print_run, OutputFormat};

/// Arguments for the `once` subcommand.
#[derive(Args)]
pub struct OnceArgs {
    /// Log new listings instead of emailing them, and do not save state
    #[arg(long)]
    pub dry_run: bool,

    /// Output format: table or json
    #[arg(long, default_value = "table")]
    pub output: String,
}

pub async fn run(args: &OnceArgs, config_path: &Path) -> Result<()> {
    let config = super::load_config(config_path)?;
    let watcher = Watcher::from_config(&config, args.dry_run)?;
    let summary = watcher.run().await;
    print_run(&summary, &OutputFormat::parse(&args.output));
    Ok(())
}
