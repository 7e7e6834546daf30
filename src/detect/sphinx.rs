use regex::Regex;
use std::sync::LazyLock;

use super::{DetectionError, DetectionStrategy, Probe};
use crate::state::SiteType;

static THEME_CLASS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"class="[^"]*(?:document|sphinx|body)"#).expect("valid regex"));

static LAYOUT_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<div[^>]*id="(?:searchbox|sidebar|related)""#).expect("valid regex")
});

static BUILD_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/_static/|/_sources/|/_images/").expect("valid regex"));

/// Detects Sphinx documentation builds
#[derive(Debug, Default, Clone, Copy)]
pub struct SphinxStrategy;

impl DetectionStrategy for SphinxStrategy {
    fn site_type(&self) -> SiteType {
        SiteType::Sphinx
    }

    fn detect(&self, probe: &Probe<'_>) -> Result<bool, DetectionError> {
        if !probe.is_html() {
            return Ok(false);
        }

        Ok(THEME_CLASS.is_match(&probe.body)
            || LAYOUT_ID.is_match(&probe.body)
            || BUILD_PATH.is_match(&probe.body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::FetchResult;
    use url::Url;

    fn detect(content_type: &str, body: &str) -> bool {
        let response = FetchResult::new(
            Url::parse("https://docs.example.org/").unwrap(),
            200,
            content_type,
            body,
        );
        SphinxStrategy.detect(&Probe::new(&response)).unwrap()
    }

    #[test]
    fn test_theme_classes() {
        assert!(detect("text/html", r#"<div class="documentwrapper">"#));
        assert!(detect("text/html", r#"<div class="section sphinxsidebar">"#));
        assert!(detect("text/html", r#"<div class="bodywrapper">"#));
    }

    #[test]
    fn test_layout_ids() {
        assert!(detect("text/html", r#"<div role="search" id="searchbox">"#));
        assert!(detect("text/html", r#"<div class="x" id="related">"#));
    }

    #[test]
    fn test_build_paths() {
        assert!(!detect("text/html", r#"<script src="_static/doctools.js">"#));
        assert!(detect("text/html", r#"<script src="/_static/doctools.js">"#));
        assert!(detect("text/html", r#"<a href="/_sources/index.rst.txt">"#));
    }

    #[test]
    fn test_non_html_never_matches() {
        assert!(!detect("text/plain", r#"class="document""#));
    }
}
