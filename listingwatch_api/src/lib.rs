//! Site plumbing for the listing watcher: HTTP session, search URL builder,
//! the document-tree abstraction, and the result-page record extractor.

mod client;
pub mod dom;
mod errors;
pub mod extract;
mod query;
pub mod types;
pub mod user_agent;

pub use self::client::{Client, DEFAULT_BASE_URL};
pub use self::errors::Error;
pub use self::extract::{ExtractError, FieldPolicy, ResultsPage};
pub use self::query::{SearchQuery, ORDER_NEWEST, RESULTS_PATH};
pub use self::types::Listing;
