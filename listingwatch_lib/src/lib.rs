//! Library layer for the listing watcher: configuration, the paginated
//! crawl, run-scoped deduplication, persisted state and notification.
//!
//! Wraps the `listingwatch_api` crate, which owns the HTTP session and the
//! result-page extractor.

pub mod config;
pub mod crawl;
pub mod dedup;
pub mod error;
pub mod job;
pub mod notify;
pub mod store;

pub use listingwatch_api;
pub use listingwatch_api::{Client, FieldPolicy, Listing, SearchQuery};

pub use config::{Config, ConfigError, EmailConfig, DEFAULT_CONFIG_PATH};
pub use crawl::{crawl, CrawlOutcome, CrawlSettings, ResultsSource, StopReason};
pub use dedup::{new_listings, RunState};
pub use error::WatchError;
pub use job::{run_once, JobOptions, RunSummary, Watcher};
pub use notify::{AnyNotifier, EmailNotifier, LogNotifier, Notifier, NotifyError, NotifyReport};
pub use store::{SeenStore, StoreError};
