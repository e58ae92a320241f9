//! HTTP session for the marketplace's search results.

use std::time::Duration;

use url::Url;

use crate::{extract::ResultsPage, query::SearchQuery, user_agent::get_user_agent, Error};

/// Production site origin.
pub const DEFAULT_BASE_URL: &str = "https://www.gunsinternational.com";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Browser-like HTTP session for the marketplace.
///
/// One `reqwest::Client` with a cookie store backs every request, so cookies
/// set by one response (the age gate in particular) are sent on the next.
/// The user agent is picked once when the session is built and kept for its
/// lifetime. Requests are issued strictly one at a time by the caller.
pub struct Client {
    base_url: Url,
    http: reqwest::Client,
}

impl Client {
    /// Creates a session pointing at the production site.
    pub fn new() -> Result<Self, Error> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Creates a session with a custom base URL. Used for testing with wiremock.
    pub fn with_base_url(base_url: &str) -> Result<Self, Error> {
        Self::with_options(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_options(base_url: &str, timeout: Duration) -> Result<Self, Error> {
        let base_url = Url::parse(base_url)?;
        let http = reqwest::Client::builder()
            .user_agent(get_user_agent())
            .timeout(timeout)
            .cookie_store(true)
            .gzip(true)
            .build()
            .map_err(|e| {
                tracing::error!("Failed to build HTTP client: {}", e);
                Error::Request(e)
            })?;
        Ok(Self { base_url, http })
    }

    /// Origin that relative detail links are resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Fetches one results page.
    ///
    /// On the first page of a run, a response carrying the age-confirmation
    /// control is fetched exactly once more within the same session, and the
    /// second body is returned whether or not it still shows the gate.
    pub async fn results_page(
        &self,
        query: &SearchQuery,
        first_page: bool,
    ) -> Result<String, Error> {
        let url = query.to_url(&self.base_url)?;
        let body = self.fetch_html(&url).await?;
        if !first_page || !ResultsPage::parse(&body).has_age_gate() {
            return Ok(body);
        }

        tracing::info!("Age verification page detected, reloading within session");
        let body = self.fetch_html(&url).await?;
        if ResultsPage::parse(&body).has_age_gate() {
            tracing::warn!("Age verification page still present after reload");
        }
        Ok(body)
    }

    /// GETs `url` and returns the body of a success response.
    pub async fn fetch_html(&self, url: &Url) -> Result<String, Error> {
        tracing::debug!("GET {}", url);
        let resp = self
            .http
            .get(url.clone())
            .header("accept", "text/html,application/xhtml+xml")
            .header("accept-language", "en-US,en;q=0.9")
            .header("upgrade-insecure-requests", "1")
            .header("cache-control", "no-cache")
            .header("pragma", "no-cache")
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to get {}: {}", url, e);
                Error::Request(e)
            })?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| {
            tracing::error!("Failed to read response body: {}", e);
            Error::Request(e)
        })?;

        if !status.is_success() {
            let snippet = truncate_body(&body);
            tracing::error!("Request failed with status {}: {}", status, snippet);
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                body: snippet,
            });
        }

        Ok(body)
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 2000;
    if body.len() <= MAX {
        return body.to_string();
    }
    let mut end = MAX;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...[truncated]", &body[..end])
}
