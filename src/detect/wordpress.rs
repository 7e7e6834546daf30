use regex::Regex;
use std::sync::LazyLock;

use super::{DetectionError, DetectionStrategy, Probe};
use crate::state::SiteType;

static GENERATOR_META: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta[^>]+name="generator"[^>]+content="wordpress"#).expect("valid regex")
});

static ASSET_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/wp-content/|/wp-includes/").expect("valid regex"));

/// Detects WordPress sites
///
/// Headers are checked first and match regardless of content type; the body is
/// only scanned for HTML responses.
#[derive(Debug, Default, Clone, Copy)]
pub struct WordPressStrategy;

impl DetectionStrategy for WordPressStrategy {
    fn site_type(&self) -> SiteType {
        SiteType::WordPress
    }

    fn detect(&self, probe: &Probe<'_>) -> Result<bool, DetectionError> {
        if probe.header_contains("x-powered-by", "wordpress") || probe.header_contains("link", "wp-json")
        {
            return Ok(true);
        }

        if !probe.is_html() {
            return Ok(false);
        }

        Ok(GENERATOR_META.is_match(&probe.body)
            || ASSET_PATH.is_match(&probe.body)
            || probe.body.contains("wpadminbar"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::FetchResult;
    use url::Url;

    fn response(content_type: &str, body: &str) -> FetchResult {
        FetchResult::new(
            Url::parse("https://blog.example.com/").unwrap(),
            200,
            content_type,
            body,
        )
    }

    fn detect(response: &FetchResult) -> bool {
        WordPressStrategy.detect(&Probe::new(response)).unwrap()
    }

    #[test]
    fn test_powered_by_header() {
        let r = response("text/html", "").with_header("x-powered-by", "WordPress");
        assert!(detect(&r));
    }

    #[test]
    fn test_link_header_on_non_html() {
        let r = response("application/json", "{}")
            .with_header("link", "<https://blog.example.com/wp-json/>; rel=\"https://api.w.org/\"");
        assert!(detect(&r));
    }

    #[test]
    fn test_generator_meta() {
        let r = response(
            "text/html",
            r#"<meta name="generator" content="WordPress 6.4.2" />"#,
        );
        assert!(detect(&r));
    }

    #[test]
    fn test_asset_paths_and_admin_bar() {
        assert!(detect(&response(
            "text/html",
            r#"<link href="/wp-content/themes/x/style.css">"#
        )));
        assert!(detect(&response("text/html", r#"<div id="wpadminbar">"#)));
    }

    #[test]
    fn test_body_ignored_for_non_html() {
        assert!(!detect(&response("text/plain", "/wp-content/uploads")));
    }
}
