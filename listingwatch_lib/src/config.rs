//! TOML configuration, loaded once at startup and passed by reference.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use listingwatch_api::{FieldPolicy, SearchQuery, DEFAULT_BASE_URL};
use serde::Deserialize;
use url::Url;

use crate::crawl::CrawlSettings;

/// Environment variable consulted when `[email].password` is not set.
pub const PASSWORD_ENV: &str = "LISTINGWATCH_SMTP_PASSWORD";

pub const DEFAULT_CONFIG_PATH: &str = "listingwatch.toml";

const MAX_INTERVAL_MINUTES: u64 = 7 * 24 * 60;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Complete, validated configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub search: SearchConfig,
    #[serde(default)]
    pub crawl: CrawlConfig,
    #[serde(default)]
    pub extract: FieldPolicy,
    #[serde(default)]
    pub state: StateConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    pub email: Option<EmailConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SearchConfig {
    #[serde(default)]
    pub keyword: String,
    #[serde(default)]
    pub category: String,
    #[serde(default = "default_order")]
    pub order: u32,
    pub exclude_term: Option<String>,
    pub price_low: Option<u32>,
    pub price_high: Option<u32>,
    pub manufacturer: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CrawlConfig {
    pub base_url: String,
    pub target_count: usize,
    pub items_per_page: usize,
    /// Pages allowed beyond `ceil(target_count / items_per_page)`.
    pub page_margin: usize,
    pub page_delay_ms: u64,
    pub timeout_secs: u64,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            target_count: 50,
            items_per_page: 25,
            page_margin: 2,
            page_delay_ms: 1000,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StateConfig {
    pub path: PathBuf,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("seen_listings.txt"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScheduleConfig {
    pub interval_minutes: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_minutes: 60,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TlsMode {
    /// Plain connection upgraded with STARTTLS (usually port 587).
    #[default]
    Starttls,
    /// TLS from the first byte (usually port 465).
    Tls,
    /// No encryption. Local relays only.
    None,
}

#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EmailConfig {
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub tls: TlsMode,
    #[serde(default)]
    pub username: String,
    pub password: Option<String>,
    pub from: String,
    pub recipients: Vec<String>,
    #[serde(default = "default_subject_prefix")]
    pub subject_prefix: String,
}

impl EmailConfig {
    /// Password from the config file, else from [`PASSWORD_ENV`].
    pub fn resolve_password(&self) -> Option<String> {
        self.password
            .clone()
            .or_else(|| std::env::var(PASSWORD_ENV).ok())
            .filter(|p| !p.is_empty())
    }
}

impl fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("tls", &self.tls)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("from", &self.from)
            .field("recipients", &self.recipients)
            .field("subject_prefix", &self.subject_prefix)
            .finish()
    }
}

fn default_order() -> u32 {
    listingwatch_api::ORDER_NEWEST
}

fn default_smtp_port() -> u16 {
    587
}

fn default_subject_prefix() -> String {
    "New listings".to_string()
}

impl Config {
    /// Reads, parses and validates the config file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parses and validates configuration text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let crawl = &self.crawl;
        require_positive("crawl.target_count", crawl.target_count as u64)?;
        require_positive("crawl.items_per_page", crawl.items_per_page as u64)?;
        require_positive("schedule.interval_minutes", self.schedule.interval_minutes)?;
        if self.schedule.interval_minutes > MAX_INTERVAL_MINUTES {
            return Err(ConfigError::Invalid(format!(
                "schedule.interval_minutes must be at most {} (one week)",
                MAX_INTERVAL_MINUTES
            )));
        }
        require_positive("crawl.timeout_secs", crawl.timeout_secs)?;

        if self.search.keyword.trim().is_empty() && self.search.category.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "search.keyword and search.category cannot both be empty".into(),
            ));
        }
        if let (Some(low), Some(high)) = (self.search.price_low, self.search.price_high) {
            if low > high {
                return Err(ConfigError::Invalid(format!(
                    "search.price_low ({}) exceeds search.price_high ({})",
                    low, high
                )));
            }
        }

        match Url::parse(&crawl.base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            _ => {
                return Err(ConfigError::Invalid(format!(
                    "crawl.base_url must be an absolute http(s) URL, got {:?}",
                    crawl.base_url
                )))
            }
        }

        if let Some(email) = &self.email {
            if email.smtp_host.trim().is_empty() {
                return Err(ConfigError::Invalid("email.smtp_host is empty".into()));
            }
            if email.recipients.is_empty() {
                return Err(ConfigError::Invalid(
                    "email.recipients must list at least one address".into(),
                ));
            }
        }
        Ok(())
    }

    /// Page-1 search query built from `[search]`.
    pub fn search_query(&self) -> SearchQuery {
        let search = &self.search;
        let mut query = SearchQuery::new(search.keyword.trim(), search.category.trim())
            .with_order(search.order)
            .with_price_range(search.price_low, search.price_high);
        if let Some(term) = search.exclude_term.as_deref() {
            query = query.with_exclude_term(term);
        }
        if let Some(manufacturer) = search.manufacturer.as_deref() {
            query = query.with_manufacturer(manufacturer);
        }
        query
    }

    pub fn crawl_settings(&self) -> CrawlSettings {
        CrawlSettings {
            search: self.search_query(),
            target_count: self.crawl.target_count,
            items_per_page: self.crawl.items_per_page,
            page_margin: self.crawl.page_margin,
            page_delay: Duration::from_millis(self.crawl.page_delay_ms),
            policy: self.extract,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.crawl.timeout_secs)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.schedule.interval_minutes.saturating_mul(60))
    }
}

fn require_positive(name: &str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::Invalid(format!("{} must be positive", name)));
    }
    Ok(())
}
