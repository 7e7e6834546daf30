use regex::Regex;
use std::sync::LazyLock;

use super::{DetectionError, DetectionStrategy, Probe};
use crate::state::SiteType;

static FRAMEWORK_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)flask\.(?:app|debughelpers)").expect("valid regex"));

static TEMPLATE_DELIMITERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{.*?\}\}|\{%-? .*? -?%\}").expect("valid regex"));

/// Detects Flask applications
///
/// Matches HTML responses carrying any of: a Flask internal module name, Jinja
/// delimiters left in the output, a `/static/` path, or `X-Powered-By: Flask`.
#[derive(Debug, Default, Clone, Copy)]
pub struct FlaskStrategy;

impl DetectionStrategy for FlaskStrategy {
    fn site_type(&self) -> SiteType {
        SiteType::Flask
    }

    fn detect(&self, probe: &Probe<'_>) -> Result<bool, DetectionError> {
        if !probe.is_html() {
            return Ok(false);
        }

        Ok(FRAMEWORK_MARKER.is_match(&probe.body)
            || TEMPLATE_DELIMITERS.is_match(&probe.body)
            || probe.body.contains("/static/")
            || probe.header_contains("x-powered-by", "flask"))
    }
}
