//! Record types produced by the extractor.

use serde::{Deserialize, Serialize};

/// One marketplace listing scraped from a results page.
///
/// `identifier` is the site-assigned key and is treated as an opaque string.
/// Every other field except `listing_url` is best-effort.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    pub identifier: String,
    pub title: Option<String>,
    pub description: Option<String>,
    /// Display text such as `$1,250.00`, never parsed as a number.
    pub price: Option<String>,
    /// Absolute URL of the listing's detail page.
    pub listing_url: String,
}

impl Listing {
    /// Title for display, with a placeholder when the markup had none.
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or("(untitled)")
    }

    /// Price for display, with a placeholder when the markup had none.
    pub fn display_price(&self) -> &str {
        self.price.as_deref().unwrap_or("Price not listed")
    }
}
