//! Error types for the library layer.

use std::fmt;

use crate::config::ConfigError;
use crate::notify::NotifyError;

/// Errors that abort a watcher run or prevent one from starting.
///
/// Page-fetch failures inside a crawl are not here: they end the crawl and
/// are reported through its stop reason. Save failures are logged and show
/// up as `RunSummary::saved == false`.
#[derive(Debug)]
pub enum WatchError {
    /// The HTTP client could not be built.
    Api(listingwatch_api::Error),
    /// Configuration could not be loaded or is invalid.
    Config(ConfigError),
    /// The notifier could not be constructed.
    Notify(NotifyError),
}

impl fmt::Display for WatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Api(e) => write!(f, "API error: {}", e),
            Self::Config(e) => write!(f, "Config error: {}", e),
            Self::Notify(e) => write!(f, "Notification error: {}", e),
        }
    }
}

impl std::error::Error for WatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Api(e) => Some(e),
            Self::Config(e) => Some(e),
            Self::Notify(e) => Some(e),
        }
    }
}

impl From<listingwatch_api::Error> for WatchError {
    fn from(e: listingwatch_api::Error) -> Self {
        Self::Api(e)
    }
}

impl From<ConfigError> for WatchError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<NotifyError> for WatchError {
    fn from(e: NotifyError) -> Self {
        Self::Notify(e)
    }
}
