//! Sitewise: an adaptive site crawler
//!
//! This crate crawls a configured set of sites, fetching pages and following links
//! under depth, domain and politeness constraints. Each site is probed once to detect
//! what kind of site it is (Flask, Sphinx, WordPress, PDF, ...) and the crawl adapts
//! its behavior to the detected type.

pub mod config;
pub mod content;
pub mod crawler;
pub mod detect;
pub mod output;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Sitewise operations
#[derive(Debug, Error)]
pub enum SitewiseError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Detection error: {0}")]
    Detection(#[from] detect::DetectionError),

    #[error("Content error: {0}")]
    Content(#[from] content::ContentError),

    #[error("Storage error: {0}")]
    StorageError(#[from] storage::StorageError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("Shutdown in progress, not starting {0}")]
    ShuttingDown(String),

    #[error("Crawl task {label} failed: {message}")]
    TaskFailed { label: String, message: String },
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid domain pattern: {0}")]
    InvalidPattern(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Result type alias for Sitewise operations
pub type Result<T> = std::result::Result<T, SitewiseError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::{Config, CrawlerSettings, SiteSpec};
pub use crawler::{CrawlManager, FetchClient, FetchResult};
pub use state::{SiteType, TaskState};
pub use url::{extract_domain, normalize_url};
