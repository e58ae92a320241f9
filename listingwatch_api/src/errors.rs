//! Error types for fetching result pages.

/// Errors that can occur when fetching a page from the marketplace.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A URL could not be built from the base URL and query.
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The HTTP request failed (network error, timeout, or unreadable body).
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// The site returned a non-success status with a body snippet.
    #[error("request failed with status {status}")]
    HttpStatus { status: u16, body: String },
}
