//! The `test-notify` subcommand: exercise the SMTP settings without crawling.

use std::path::Path;

use anyhow::{bail, Result};
use listingwatch_lib::EmailNotifier;

use crate::output::print_deliveries;

pub async fn run(config_path: &Path) -> Result<()> {
    let config = super::load_config(config_path)?;
    let Some(email) = config.email.as_ref() else {
        bail!("no [email] section in {}", config_path.display());
    };

    let notifier = EmailNotifier::from_config(email)?;
    let report = notifier.send_test().await;
    print_deliveries(&report);

    if report.all_failed() {
        bail!("test message could not be delivered to any recipient");
    }
    Ok(())
}
