//! Site type detection
//!
//! A [`SiteDetector`] fetches one probe response for a site and runs an ordered
//! list of [`DetectionStrategy`] predicates over it. The first strategy that
//! matches decides the site type; when none does, the site is `Generic`.
//!
//! Strategies only look at the probe they are given and never touch the network.
//! The strategy list is fixed when the detector is built.

mod flask;
mod pdf;
mod sphinx;
mod wordpress;

pub use flask::FlaskStrategy;
pub use pdf::PdfStrategy;
pub use sphinx::SphinxStrategy;
pub use wordpress::WordPressStrategy;

use std::borrow::Cow;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::crawler::{FetchClient, FetchResult, RequestFailure};
use crate::state::SiteType;
use crate::url::normalize_url;
use crate::UrlError;

/// Detection-specific errors
#[derive(Debug, Error)]
pub enum DetectionError {
    #[error("No detection strategies registered")]
    NoStrategies,

    #[error("Invalid probe URL: {0}")]
    InvalidUrl(#[from] UrlError),

    #[error("Probe of {url} failed: {source}")]
    ProbeFailed {
        url: String,
        #[source]
        source: RequestFailure,
    },

    #[error("{strategy} strategy failed: {message}")]
    Strategy { strategy: SiteType, message: String },
}

/// A probe response with its body decoded once for all strategies
pub struct Probe<'a> {
    pub response: &'a FetchResult,
    pub body: Cow<'a, str>,
}

impl<'a> Probe<'a> {
    pub fn new(response: &'a FetchResult) -> Self {
        Self {
            response,
            body: response.text(),
        }
    }

    pub fn is_html(&self) -> bool {
        self.response.is_html()
    }

    pub fn header_contains(&self, name: &str, needle: &str) -> bool {
        self.response.header_contains(name, needle)
    }
}

/// A pluggable predicate over one probe response
pub trait DetectionStrategy: Send + Sync {
    /// The site type reported when this strategy matches
    fn site_type(&self) -> SiteType;

    /// Returns whether the probe looks like this strategy's site type
    ///
    /// An error is treated as "no match" by the detector.
    fn detect(&self, probe: &Probe<'_>) -> Result<bool, DetectionError>;
}

/// The built-in strategies in their default order
pub fn default_strategies() -> Vec<Box<dyn DetectionStrategy>> {
    vec![
        Box::new(FlaskStrategy),
        Box::new(SphinxStrategy),
        Box::new(WordPressStrategy),
        Box::new(PdfStrategy),
    ]
}

/// Runs the ordered strategy list against a single probe fetch
pub struct SiteDetector {
    client: Arc<FetchClient>,
    strategies: Vec<Box<dyn DetectionStrategy>>,
}

impl SiteDetector {
    /// Creates a detector with an explicit strategy order
    ///
    /// # Arguments
    ///
    /// * `client` - The client used for the probe fetch
    /// * `strategies` - Strategies in the order they are tried
    pub fn new(client: Arc<FetchClient>, strategies: Vec<Box<dyn DetectionStrategy>>) -> Self {
        Self { client, strategies }
    }

    /// Creates a detector with [`default_strategies`]
    pub fn with_default_strategies(client: Arc<FetchClient>) -> Self {
        Self::new(client, default_strategies())
    }

    /// Site types of the registered strategies, in order
    pub fn strategy_order(&self) -> Vec<SiteType> {
        self.strategies.iter().map(|s| s.site_type()).collect()
    }

    /// Fetches `url` once and classifies the response
    ///
    /// # Returns
    ///
    /// * `Ok(SiteType)` - The first matching strategy's type, or `Generic`
    /// * `Err(DetectionError)` - No strategies are registered or the probe failed
    pub async fn detect(&self, url: &str) -> Result<SiteType, DetectionError> {
        if self.strategies.is_empty() {
            return Err(DetectionError::NoStrategies);
        }

        let url = normalize_url(url)?;
        let response = self
            .client
            .fetch(&url)
            .await
            .map_err(|source| DetectionError::ProbeFailed {
                url: url.to_string(),
                source,
            })?;

        let site_type = self.classify(&response);
        info!(url = %url, site_type = %site_type, "Detected site type");
        Ok(site_type)
    }

    /// Classifies an already fetched response
    ///
    /// A strategy that errors is logged and skipped.
    pub fn classify(&self, response: &FetchResult) -> SiteType {
        let probe = Probe::new(response);

        for strategy in &self.strategies {
            match strategy.detect(&probe) {
                Ok(true) => return strategy.site_type(),
                Ok(false) => {
                    debug!(strategy = %strategy.site_type(), "Strategy did not match");
                }
                Err(e) => {
                    warn!(
                        strategy = %strategy.site_type(),
                        error = %e,
                        "Detection strategy failed, trying the next one"
                    );
                }
            }
        }

        SiteType::Generic
    }

    /// Releases the probe client's session
    pub fn close(&self) {
        self.client.close();
    }
}
