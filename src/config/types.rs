use serde::Deserialize;
use std::time::Duration;

use crate::state::SiteType;
use crate::url::{extract_domain, normalize_url};

/// Main configuration structure for Sitewise
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerSettings,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default, rename = "site")]
    pub sites: Vec<SiteSpec>,
}

/// Crawler behavior configuration
///
/// Shared read-only by every crawl task during a run.
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerSettings {
    /// Maximum depth to crawl from a site's root URL
    #[serde(rename = "max-depth", default = "default_max_depth")]
    pub max_depth: u32,

    /// Timeout for a single HTTP request attempt
    #[serde(
        rename = "request-timeout-seconds",
        default = "default_request_timeout"
    )]
    pub request_timeout_seconds: u64,

    /// Number of attempts per fetch (transport failures only)
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay between failed attempts
    #[serde(rename = "retry-delay-seconds", default = "default_retry_delay")]
    pub retry_delay_seconds: f64,

    /// User-Agent header sent with every request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Minimum spacing between requests issued by one fetch client
    #[serde(
        rename = "politeness-delay-seconds",
        default = "default_politeness_delay"
    )]
    pub politeness_delay_seconds: f64,

    /// Upper bound on how long shutdown waits for tasks to unwind
    #[serde(
        rename = "shutdown-timeout-seconds",
        default = "default_shutdown_timeout"
    )]
    pub shutdown_timeout_seconds: f64,

    /// Pause between crawl passes; a single pass when unset
    #[serde(rename = "recrawl-interval-seconds", default)]
    pub recrawl_interval_seconds: Option<u64>,
}

/// Upper bound for every fractional-seconds delay setting (one day)
pub const MAX_DELAY_SECONDS: f64 = 86_400.0;

/// Converts a delay setting, clamped to `0..=MAX_DELAY_SECONDS`; NaN is zero
fn delay(seconds: f64) -> Duration {
    Duration::try_from_secs_f64(seconds.clamp(0.0, MAX_DELAY_SECONDS)).unwrap_or(Duration::ZERO)
}

impl CrawlerSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn retry_delay(&self) -> Duration {
        delay(self.retry_delay_seconds)
    }

    pub fn politeness_delay(&self) -> Duration {
        delay(self.politeness_delay_seconds)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        delay(self.shutdown_timeout_seconds)
    }

    pub fn recrawl_interval(&self) -> Option<Duration> {
        self.recrawl_interval_seconds.map(Duration::from_secs)
    }
}

impl Default for CrawlerSettings {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            request_timeout_seconds: default_request_timeout(),
            max_retries: default_max_retries(),
            retry_delay_seconds: default_retry_delay(),
            user_agent: default_user_agent(),
            politeness_delay_seconds: default_politeness_delay(),
            shutdown_timeout_seconds: default_shutdown_timeout(),
            recrawl_interval_seconds: None,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Root directory for saved pages; one subdirectory per host
    #[serde(rename = "output-dir", default = "default_output_dir")]
    pub output_dir: String,

    /// Save fetched HTML pages
    #[serde(rename = "save-html", default = "default_true")]
    pub save_html: bool,

    /// Save fetched PDF documents
    #[serde(rename = "save-pdf", default = "default_true")]
    pub save_pdf: bool,

    /// Path to the SQLite crawl ledger
    #[serde(rename = "database-path", default = "default_database_path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            save_html: true,
            save_pdf: true,
            database_path: default_database_path(),
        }
    }
}

/// One site to crawl
#[derive(Debug, Clone, Deserialize)]
pub struct SiteSpec {
    /// Root URL of the site; the scheme may be omitted
    pub url: String,

    /// Explicit site type; skips detection when set
    #[serde(rename = "type", default)]
    pub site_type: Option<String>,

    /// Domain patterns the crawl may visit (e.g., "example.com" or "*.example.com")
    #[serde(rename = "allowed-domains", default)]
    pub allowed_domains: Option<Vec<String>>,

    /// Let the Sphinx variant also probe `/_downloads/`
    #[serde(rename = "include-pdf", default)]
    pub include_pdf: bool,
}

impl SiteSpec {
    /// Creates a site with no explicit type and default allowed domains
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            site_type: None,
            allowed_domains: None,
            include_pdf: false,
        }
    }

    /// Sets the explicit site type
    pub fn with_type(mut self, site_type: impl Into<String>) -> Self {
        self.site_type = Some(site_type.into());
        self
    }

    /// Sets the allowed domain patterns
    pub fn with_allowed_domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_domains = Some(domains.into_iter().map(Into::into).collect());
        self
    }

    /// Returns the explicit site type, if one is configured
    ///
    /// An empty string counts as unset; unknown names map to `Generic`.
    pub fn explicit_type(&self) -> Option<SiteType> {
        self.site_type
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(SiteType::from_config_str)
    }

    /// Returns the allowed domains, defaulting to the root URL's own host
    ///
    /// Patterns are lowercased. An unset or empty list falls back to the host of
    /// `url`; if that cannot be parsed the result is empty and nothing is crawled.
    pub fn effective_allowed_domains(&self) -> Vec<String> {
        match &self.allowed_domains {
            Some(domains) if !domains.is_empty() => domains
                .iter()
                .map(|d| d.trim().to_lowercase())
                .collect(),
            _ => normalize_url(&self.url)
                .ok()
                .and_then(|u| extract_domain(&u))
                .into_iter()
                .collect(),
        }
    }
}

fn default_max_depth() -> u32 {
    3
}

fn default_request_timeout() -> u64 {
    10
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay() -> f64 {
    1.0
}

fn default_user_agent() -> String {
    "SiteCrawler/1.0".to_string()
}

fn default_politeness_delay() -> f64 {
    1.0
}

fn default_shutdown_timeout() -> f64 {
    30.0
}

fn default_output_dir() -> String {
    "./output".to_string()
}

fn default_database_path() -> String {
    "./output/crawl.db".to_string()
}

fn default_true() -> bool {
    true
}
