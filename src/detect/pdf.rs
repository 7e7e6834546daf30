use regex::Regex;
use std::sync::LazyLock;

use super::{DetectionError, DetectionStrategy, Probe};
use crate::state::SiteType;

static PDF_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)\.pdf(['"]|$)"#).expect("valid regex"));

static PDF_PATH: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\.pdf$").expect("valid regex"));

/// Detects PDF documents
///
/// # Detection Order
///
/// 1. Content-Type containing `application/pdf` matches immediately
/// 2. An HTML body linking to a `.pdf` decides the result
/// 3. Otherwise the URL path ending in `.pdf` decides
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfStrategy;

impl DetectionStrategy for PdfStrategy {
    fn site_type(&self) -> SiteType {
        SiteType::Pdf
    }

    fn detect(&self, probe: &Probe<'_>) -> Result<bool, DetectionError> {
        if probe.response.is_pdf() {
            return Ok(true);
        }

        if probe.is_html() && !probe.response.body.is_empty() {
            return Ok(PDF_LINK.is_match(&probe.body));
        }

        Ok(PDF_PATH.is_match(probe.response.url.path()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::FetchResult;
    use url::Url;

    fn detect(url: &str, content_type: &str, body: &str) -> bool {
        let response = FetchResult::new(Url::parse(url).unwrap(), 200, content_type, body);
        PdfStrategy.detect(&Probe::new(&response)).unwrap()
    }

    #[test]
    fn test_pdf_content_type() {
        assert!(detect("https://example.com/download", "application/pdf", "%PDF-1.7"));
    }

    #[test]
    fn test_html_with_pdf_link() {
        assert!(detect(
            "https://example.com/",
            "text/html",
            r#"<a href="/files/Report.PDF">report</a>"#
        ));
        assert!(!detect(
            "https://example.com/",
            "text/html",
            r#"<a href="/files/report.pdfx">report</a>"#
        ));
    }

    #[test]
    fn test_url_suffix() {
        assert!(detect("https://example.com/paper.pdf", "application/octet-stream", ""));
        assert!(!detect("https://example.com/paper.txt", "text/plain", ""));
    }
}
