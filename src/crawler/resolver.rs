//! Site type resolution
//!
//! An explicit `type` in the site's configuration always wins; detection only
//! runs for sites without one.

use tracing::info;

use crate::config::SiteSpec;
use crate::detect::{DetectionError, SiteDetector};
use crate::state::SiteType;

/// Decides which crawl variant a site gets
pub struct CrawlResolver {
    detector: SiteDetector,
}

impl CrawlResolver {
    pub fn new(detector: SiteDetector) -> Self {
        Self { detector }
    }

    /// Resolves the site type for `site`
    ///
    /// # Returns
    ///
    /// * `Ok(SiteType)` - The explicit type, or the detected one
    /// * `Err(DetectionError)` - Detection was needed and failed
    pub async fn resolve(&self, site: &SiteSpec) -> Result<SiteType, DetectionError> {
        if let Some(site_type) = site.explicit_type() {
            info!(site = %site.url, site_type = %site_type, "Using configured site type");
            return Ok(site_type);
        }

        self.detector.detect(&site.url).await
    }

    /// Closes the detector's probe session
    pub fn close(&self) {
        self.detector.close();
    }
}
