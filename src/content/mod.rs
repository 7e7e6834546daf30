//! Content processing collaborators
//!
//! The crawl engine hands every fetched page to a [`ContentProcessor`], which
//! persists it and reports where, and asks it for the page's outbound links.
//! The PDF variant additionally uses a [`TextExtractor`].
//!
//! # Components
//!
//! - `FileContentProcessor`: Saves HTML and PDF bodies under the output directory
//! - `DefaultTextExtractor`: PDF (via `pdf-extract`) and HTML text extraction
//! - `html`: Link, title and visible-text extraction with `scraper`

mod extract;
mod files;
mod html;

pub use extract::{truncate_preview, DefaultTextExtractor, DocumentFormat, TextExtractor, PREVIEW_CHARS};
pub use files::{safe_filename, FileContentProcessor};
pub use html::{extract_links, extract_title, parse_html, visible_text, ParsedPage};

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

use crate::crawler::FetchResult;

/// Content-specific errors
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// What the processor did with one page
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedContent {
    pub url: String,
    pub status_code: u16,
    pub content_type: String,
    /// Where the body was written, if it was
    pub saved_path: Option<PathBuf>,
    /// Extracted metadata such as `title`
    pub metadata: BTreeMap<String, String>,
}

impl ProcessedContent {
    /// An outcome for `result` with nothing saved yet
    pub fn unsaved(result: &FetchResult) -> Self {
        Self {
            url: result.url.to_string(),
            status_code: result.status_code,
            content_type: result.content_type.clone(),
            saved_path: None,
            metadata: BTreeMap::new(),
        }
    }

    pub fn title(&self) -> Option<&str> {
        self.metadata.get("title").map(String::as_str)
    }
}

/// Persists fetched content and extracts links from HTML
#[async_trait]
pub trait ContentProcessor: Send + Sync {
    /// Stores `result` under `destination` and reports the outcome
    async fn process_content(
        &self,
        result: &FetchResult,
        destination: &Path,
    ) -> Result<ProcessedContent, ContentError>;

    /// Returns the absolute HTTP(S) links of an HTML page
    fn extract_links(&self, html: &str, base_url: &Url) -> Result<Vec<Url>, ContentError>;
}
