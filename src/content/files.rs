use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use url::Url;

use super::html::{extract_links, extract_title};
use super::{ContentError, ContentProcessor, ProcessedContent};
use crate::config::StorageConfig;
use crate::crawler::FetchResult;

const MAX_STEM_CHARS: usize = 50;

/// Creates a filesystem-safe file stem for a URL
///
/// The stem is the last path segment (or `index`), cut to 50 characters, then
/// `_` and the first 8 hex characters of the URL's SHA-256 digest so distinct
/// URLs with the same last segment do not collide.
///
/// # Example
///
/// ```
/// use sitewise::content::safe_filename;
///
/// let name = safe_filename("https://example.com/guide/install");
/// assert!(name.starts_with("install_"));
/// assert_eq!(name.len(), "install_".len() + 8);
/// ```
pub fn safe_filename(url: &str) -> String {
    let digest = hex::encode(Sha256::digest(url.as_bytes()));

    let segment = Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "index".to_string());

    let stem: String = segment
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .take(MAX_STEM_CHARS)
        .collect();

    format!("{}_{}", stem, &digest[..8])
}

/// Saves HTML and PDF bodies to disk
///
/// # Layout
///
/// - HTML: `<destination>/<safe_filename>.html`
/// - PDF: `<destination>/pdfs/<safe_filename>.pdf`
///
/// Other content types are not saved. A failed write is logged and reported as
/// `saved_path: None`; it never fails the page.
#[derive(Debug, Clone)]
pub struct FileContentProcessor {
    save_html: bool,
    save_pdf: bool,
}

impl FileContentProcessor {
    pub fn new(save_html: bool, save_pdf: bool) -> Self {
        Self {
            save_html,
            save_pdf,
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(config.save_html, config.save_pdf)
    }

    async fn write(&self, path: PathBuf, body: &[u8], url: &str) -> Option<PathBuf> {
        let result = async {
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&path, body).await
        }
        .await;

        match result {
            Ok(()) => {
                debug!(url = %url, path = %path.display(), "Saved content");
                Some(path)
            }
            Err(e) => {
                warn!(url = %url, path = %path.display(), error = %e, "Failed to save content");
                None
            }
        }
    }
}

impl Default for FileContentProcessor {
    fn default() -> Self {
        Self::new(true, true)
    }
}

#[async_trait]
impl ContentProcessor for FileContentProcessor {
    async fn process_content(
        &self,
        result: &FetchResult,
        destination: &Path,
    ) -> Result<ProcessedContent, ContentError> {
        let mut processed = ProcessedContent::unsaved(result);
        let url = result.url.as_str();

        if result.is_html() {
            if self.save_html {
                let path = destination.join(format!("{}.html", safe_filename(url)));
                processed.saved_path = self.write(path, &result.body, url).await;
            }

            if let Some(title) = extract_title(&result.text()) {
                processed.metadata.insert("title".to_string(), title);
            }
        } else if result.is_pdf() {
            if self.save_pdf {
                let path = destination
                    .join("pdfs")
                    .join(format!("{}.pdf", safe_filename(url)));
                processed.saved_path = self.write(path, &result.body, url).await;
            }
        } else {
            debug!(url = %url, content_type = %result.content_type, "Content type not saved");
        }

        Ok(processed)
    }

    fn extract_links(&self, html: &str, base_url: &Url) -> Result<Vec<Url>, ContentError> {
        Ok(extract_links(html, base_url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn html_page(url: &str) -> FetchResult {
        FetchResult::new(
            Url::parse(url).unwrap(),
            200,
            "text/html; charset=utf-8",
            "<html><head><title>Guide</title></head><body><a href=\"/next\">n</a></body></html>",
        )
    }

    #[test]
    fn test_safe_filename() {
        let a = safe_filename("https://example.com/guide/install");
        let b = safe_filename("https://example.org/guide/install");

        assert!(a.starts_with("install_"));
        assert_ne!(a, b);
        assert!(safe_filename("https://example.com/").starts_with("index_"));
    }

    #[test]
    fn test_safe_filename_truncates_and_sanitizes() {
        let long = format!("https://example.com/{}", "a".repeat(80));
        let name = safe_filename(&long);
        assert_eq!(name.len(), 50 + 1 + 8);

        let odd = safe_filename("https://example.com/a:b@c");
        assert!(odd.starts_with("a_b_c_"));
    }

    #[tokio::test]
    async fn test_saves_html_with_title() {
        let dir = TempDir::new().unwrap();
        let processor = FileContentProcessor::default();
        let page = html_page("https://example.com/guide");

        let processed = processor.process_content(&page, dir.path()).await.unwrap();

        let saved = processed.saved_path.clone().unwrap();
        assert!(saved.starts_with(dir.path()));
        assert_eq!(saved.extension().unwrap(), "html");
        assert_eq!(std::fs::read(&saved).unwrap(), page.body);
        assert_eq!(processed.title(), Some("Guide"));
        assert_eq!(processed.status_code, 200);
    }

    #[tokio::test]
    async fn test_saves_pdf_under_pdfs() {
        let dir = TempDir::new().unwrap();
        let processor = FileContentProcessor::default();
        let pdf = FetchResult::new(
            Url::parse("https://example.com/paper.pdf").unwrap(),
            200,
            "application/pdf",
            b"%PDF-1.4".to_vec(),
        );

        let processed = processor.process_content(&pdf, dir.path()).await.unwrap();

        let saved = processed.saved_path.unwrap();
        assert_eq!(saved.parent().unwrap(), dir.path().join("pdfs"));
        assert!(saved.file_name().unwrap().to_str().unwrap().starts_with("paper.pdf_"));
    }

    #[tokio::test]
    async fn test_respects_save_flags() {
        let dir = TempDir::new().unwrap();
        let processor = FileContentProcessor::new(false, false);

        let processed = processor
            .process_content(&html_page("https://example.com/"), dir.path())
            .await
            .unwrap();

        assert!(processed.saved_path.is_none());
        assert_eq!(processed.title(), Some("Guide"));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_other_content_not_saved() {
        let dir = TempDir::new().unwrap();
        let processor = FileContentProcessor::default();
        let json = FetchResult::new(
            Url::parse("https://example.com/api").unwrap(),
            200,
            "application/json",
            "{}",
        );

        let processed = processor.process_content(&json, dir.path()).await.unwrap();
        assert!(processed.saved_path.is_none());
    }

    #[tokio::test]
    async fn test_write_failure_degrades_to_unsaved() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"file, not a directory").unwrap();

        let processor = FileContentProcessor::default();
        let processed = processor
            .process_content(&html_page("https://example.com/x"), &blocker)
            .await
            .unwrap();

        assert!(processed.saved_path.is_none());
    }

    #[test]
    fn test_extract_links() {
        let processor = FileContentProcessor::default();
        let base = Url::parse("https://example.com/a/").unwrap();
        let links = processor
            .extract_links(r#"<a href="b">b</a><a href="mailto:x@y">m</a>"#, &base)
            .unwrap();
        assert_eq!(links, vec![Url::parse("https://example.com/a/b").unwrap()]);
    }
}
