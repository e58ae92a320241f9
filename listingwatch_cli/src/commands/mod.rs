//! CLI subcommand implementations.

pub mod check_config;
pub mod once;
pub mod test_notify;
pub mod watch;

use std::path::Path;

use anyhow::{Context, Result};
use listingwatch_lib::Config;

pub(crate) fn load_config(path: &Path) -> Result<Config> {
    Config::load(path).with_context(|| format!("cannot use config {}", path.display()))
}
