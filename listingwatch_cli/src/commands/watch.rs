//! The `watch` subcommand: run on a fixed interval until interrupted.

use std::path::Path;

use anyhow::Result;
use listingwatch_lib::Watcher;
use tokio::time::{interval, MissedTickBehavior};

pub async fn run(config_path: &Path) -> Result<()> {
    let config = super::load_config(config_path)?;
    let watcher = Watcher::from_config(&config, false)?;

    let period = config.interval();
    let mut ticker = interval(period);
    // Overrunning runs push the next tick back; missed ticks are not replayed.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::info!(
        "Watching every {} minutes, state in {}",
        config.schedule.interval_minutes,
        watcher.store().path().display()
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, exiting");
                break;
            }
        }

        let summary = watcher.run().await;
        if summary.new_listings.is_empty() {
            tracing::info!("No new listings ({})", summary.stop);
        } else {
            tracing::info!(
                "{} new listings ({})",
                summary.new_listings.len(),
                summary.stop
            );
        }
    }

    Ok(())
}
