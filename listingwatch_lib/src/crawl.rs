//! Pagination controller: drives fetch and extraction across result pages.

use std::fmt;
use std::time::Duration;

use listingwatch_api::{Client, FieldPolicy, ResultsPage, SearchQuery};
use url::Url;

use crate::dedup::{Admission, RunState};

/// Anything that can serve results pages for a search.
///
/// Implemented by [`Client`]; tests substitute canned pages.
#[allow(async_fn_in_trait)]
pub trait ResultsSource {
    /// Origin that relative detail links are resolved against.
    fn base_url(&self) -> &Url;

    /// Fetches one results page. `first_page` enables the one-time
    /// age-gate reload.
    async fn results_page(
        &self,
        query: &SearchQuery,
        first_page: bool,
    ) -> Result<String, listingwatch_api::Error>;
}

impl ResultsSource for Client {
    fn base_url(&self) -> &Url {
        Client::base_url(self)
    }

    async fn results_page(
        &self,
        query: &SearchQuery,
        first_page: bool,
    ) -> Result<String, listingwatch_api::Error> {
        Client::results_page(self, query, first_page).await
    }
}

/// Inputs of one crawl.
#[derive(Debug, Clone)]
pub struct CrawlSettings {
    /// Page-1 query; `start_row` is overwritten per page.
    pub search: SearchQuery,
    pub target_count: usize,
    pub items_per_page: usize,
    pub page_margin: usize,
    /// Pause between consecutive page fetches.
    pub page_delay: Duration,
    pub policy: FieldPolicy,
}

impl CrawlSettings {
    pub fn new(search: SearchQuery, target_count: usize, items_per_page: usize) -> Self {
        Self {
            search,
            target_count,
            items_per_page,
            page_margin: 2,
            page_delay: Duration::ZERO,
            policy: FieldPolicy::default(),
        }
    }

    /// Maximum number of pages one crawl may fetch.
    pub fn page_ceiling(&self) -> usize {
        let pages = self.target_count.div_ceil(self.items_per_page.max(1));
        (pages + self.page_margin).max(1)
    }

    /// 1-based offset of the first listing on page `page_index` (1-based).
    pub fn start_row(&self, page_index: usize) -> usize {
        1 + page_index.saturating_sub(1) * self.items_per_page
    }
}

/// Why a crawl stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The run holds `target_count` listings.
    TargetReached,
    /// A page after the first added nothing new.
    EndOfResults { page: usize },
    /// Fetching a page failed; what was accepted before it stands.
    FetchFailed { page: usize, error: String },
    /// The safety page ceiling was hit.
    PageCeiling { pages: usize },
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TargetReached => write!(f, "target count reached"),
            Self::EndOfResults { page } => write!(f, "no new listings on page {}", page),
            Self::FetchFailed { page, error } => write!(f, "page {} failed: {}", page, error),
            Self::PageCeiling { pages } => write!(f, "page ceiling of {} reached", pages),
        }
    }
}

/// Result of one crawl.
#[derive(Debug)]
pub struct CrawlOutcome {
    pub run: RunState,
    /// Pages fetched successfully.
    pub pages_fetched: usize,
    pub stop: StopReason,
}

impl CrawlOutcome {
    pub fn any_page_succeeded(&self) -> bool {
        self.pages_fetched > 0
    }
}

/// Crawls result pages until a stopping rule fires.
///
/// Pages are fetched strictly in sequence. After each page the rules are
/// checked in order: target reached, empty non-first page, page ceiling.
/// A fetch failure ends the crawl immediately and is not propagated.
pub async fn crawl<S: ResultsSource>(source: &S, settings: &CrawlSettings) -> CrawlOutcome {
    let ceiling = settings.page_ceiling();
    let mut run = RunState::new();
    let mut pages_fetched = 0;
    let mut page_index = 1;

    let stop = loop {
        let start_row = settings.start_row(page_index);
        let query = settings.search.clone().with_start_row(start_row);
        tracing::info!(page = page_index, start_row, "Fetching results page");

        let body = match source.results_page(&query, page_index == 1).await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(page = page_index, "Stopping crawl, fetch failed: {}", e);
                break StopReason::FetchFailed {
                    page: page_index,
                    error: e.to_string(),
                };
            }
        };
        pages_fetched += 1;

        let accepted = accept_page(&body, source.base_url(), settings, &mut run);
        tracing::info!(
            page = page_index,
            accepted,
            total = run.len(),
            "Processed results page"
        );

        if run.len() >= settings.target_count {
            tracing::info!("Reached target count of {}", settings.target_count);
            break StopReason::TargetReached;
        }
        if page_index > 1 && accepted == 0 {
            tracing::info!(page = page_index, "No new listings on page, end of results");
            break StopReason::EndOfResults { page: page_index };
        }
        if page_index >= ceiling {
            tracing::warn!(
                pages = page_index,
                "Page ceiling reached before target count ({} of {})",
                run.len(),
                settings.target_count
            );
            break StopReason::PageCeiling { pages: page_index };
        }

        page_index += 1;
        if !settings.page_delay.is_zero() {
            tokio::time::sleep(settings.page_delay).await;
        }
    };

    CrawlOutcome {
        run,
        pages_fetched,
        stop,
    }
}

/// Extracts `body` and admits its listings into `run`, returning how many
/// were newly accepted.
fn accept_page(body: &str, base: &Url, settings: &CrawlSettings, run: &mut RunState) -> usize {
    let page = ResultsPage::parse(body);
    let mut accepted = 0;
    for listing in page.listings(base, &settings.policy) {
        match run.admit(listing, settings.target_count) {
            Admission::Accepted => accepted += 1,
            Admission::Duplicate => {}
            Admission::Full => break,
        }
    }
    accepted
}
