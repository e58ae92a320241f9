//! Advanced-search query builder for the results listing.

use url::Url;

/// Path of the advanced search results page.
pub const RESULTS_PATH: &str = "/adv-results.cfm";

/// Sort order the site uses for "newest listings first".
pub const ORDER_NEWEST: u32 = 6;

/// Parameters of one advanced-search request.
///
/// The site expects every parameter to be present even when empty, so
/// unset filters are serialized as empty values rather than omitted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchQuery {
    /// Sort order code (`the_order`).
    pub order: u32,
    /// Free-text keyword.
    pub keyword: String,
    /// Term that excluded listings contain.
    pub exclude_term: Option<String>,
    /// Category name (`type_cat`), e.g. `Revolvers`.
    pub category: String,
    pub price_low: Option<u32>,
    pub price_high: Option<u32>,
    pub manufacturer: Option<String>,
    /// 1-based position of the first listing on the page.
    pub start_row: usize,
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            order: ORDER_NEWEST,
            keyword: String::new(),
            exclude_term: None,
            category: String::new(),
            price_low: None,
            price_high: None,
            manufacturer: None,
            start_row: 1,
        }
    }
}

impl SearchQuery {
    /// Creates a query for `keyword` in `category`, starting at the first listing.
    pub fn new(keyword: &str, category: &str) -> Self {
        Self {
            keyword: keyword.to_string(),
            category: category.to_string(),
            ..Self::default()
        }
    }

    pub fn with_order(mut self, order: u32) -> Self {
        self.order = order;
        self
    }

    pub fn with_exclude_term(mut self, term: &str) -> Self {
        self.exclude_term = Some(term.to_string());
        self
    }

    pub fn with_price_range(mut self, low: Option<u32>, high: Option<u32>) -> Self {
        self.price_low = low;
        self.price_high = high;
        self
    }

    pub fn with_manufacturer(mut self, manufacturer: &str) -> Self {
        self.manufacturer = Some(manufacturer.to_string());
        self
    }

    /// Sets the 1-based offset of the first listing on the requested page.
    pub fn with_start_row(mut self, start_row: usize) -> Self {
        self.start_row = start_row;
        self
    }

    /// Builds the absolute results-page URL against `base`.
    pub fn to_url(&self, base: &Url) -> Result<Url, url::ParseError> {
        let url = base.join(RESULTS_PATH)?;
        Ok(self.add_to_url(&url))
    }

    /// Appends this query's parameters to the given URL, returning the modified URL.
    pub fn add_to_url(&self, url: &Url) -> Url {
        let mut url = url.clone();
        let price_low = self.price_low.map(|p| p.to_string()).unwrap_or_default();
        let price_high = self.price_high.map(|p| p.to_string()).unwrap_or_default();
        url.query_pairs_mut()
            .append_pair("the_order", &self.order.to_string())
            .append_pair("saved_search_id", "")
            .append_pair("keyword", &self.keyword)
            .append_pair("exclude_term", self.exclude_term.as_deref().unwrap_or(""))
            .append_pair("type_cat", &self.category)
            .append_pair("price_low", &price_low)
            .append_pair("price_high", &price_high)
            .append_pair("manufacturer", self.manufacturer.as_deref().unwrap_or(""))
            .append_pair("screenname", "")
            .append_pair("screenname_omit", "")
            .append_pair("seller_sku", "")
            .append_pair("area_code", "")
            .append_pair("age", "")
            .append_pair("start_row", &self.start_row.to_string());
        url
    }
}
