use async_trait::async_trait;
use std::fmt;
use tracing::{debug, warn};

use super::html::visible_text;

/// Maximum characters kept in a text preview
pub const PREVIEW_CHARS: usize = 1000;

/// Document formats the extractor understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Html,
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pdf => write!(f, "pdf"),
            Self::Html => write!(f, "html"),
        }
    }
}

/// Turns raw document bytes into plain text
///
/// `None` means no text could be obtained; it is not an error.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract_text(&self, format: DocumentFormat, source: &[u8]) -> Option<String>;
}

/// Extracts PDF text with `pdf-extract` and HTML text with `scraper`
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultTextExtractor;

#[async_trait]
impl TextExtractor for DefaultTextExtractor {
    async fn extract_text(&self, format: DocumentFormat, source: &[u8]) -> Option<String> {
        let text = match format {
            DocumentFormat::Pdf => {
                let bytes = source.to_vec();
                // pdf-extract is CPU bound and may panic on malformed input
                match tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
                    .await
                {
                    Ok(Ok(text)) => text,
                    Ok(Err(e)) => {
                        warn!(format = %format, error = %e, "Text extraction failed");
                        return None;
                    }
                    Err(e) => {
                        warn!(format = %format, error = %e, "Text extraction panicked");
                        return None;
                    }
                }
            }
            DocumentFormat::Html => visible_text(&String::from_utf8_lossy(source)),
        };

        let text = text.trim();
        if text.is_empty() {
            debug!(format = %format, "No text extracted");
            None
        } else {
            Some(text.to_string())
        }
    }
}

/// Cuts `text` to at most `max_chars` characters
pub fn truncate_preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_preview() {
        assert_eq!(truncate_preview("hello", 10), "hello");
        assert_eq!(truncate_preview("hello", 3), "hel");
        assert_eq!(truncate_preview("héllo wörld", 7), "héllo w");
        assert_eq!(truncate_preview(&"x".repeat(1500), PREVIEW_CHARS).len(), 1000);
    }

    #[tokio::test]
    async fn test_html_extraction() {
        let text = DefaultTextExtractor
            .extract_text(
                DocumentFormat::Html,
                b"<html><body><p>Hello</p><script>x()</script></body></html>",
            )
            .await;
        assert_eq!(text.as_deref(), Some("Hello"));
    }

    #[tokio::test]
    async fn test_empty_html_is_none() {
        let text = DefaultTextExtractor
            .extract_text(DocumentFormat::Html, b"<html><body>  </body></html>")
            .await;
        assert!(text.is_none());
    }

    #[tokio::test]
    async fn test_corrupt_pdf_is_none() {
        let text = DefaultTextExtractor
            .extract_text(DocumentFormat::Pdf, b"definitely not a pdf")
            .await;
        assert!(text.is_none());
    }
}
