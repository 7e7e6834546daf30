//! Recursive crawl engine
//!
//! One [`SiteCrawler`] crawls one site for one run. It owns the run's visited
//! set, so every URL is fetched at most once no matter how many concurrently
//! running branches discover it.
//!
//! # Page Flow
//!
//! 1. Reject pages deeper than `max_depth`
//! 2. Normalize the URL and apply the allowed-domain filter
//! 3. Test-and-insert into the visited set (a single locked step)
//! 4. Fetch through the site's [`FetchClient`], dropping responses that were
//!    redirected outside the allowed domains
//! 5. Hand the response to the [`ContentProcessor`]
//! 6. For HTML, crawl every same-host link at `depth + 1`, all at once, and
//!    wait for all of them
//! 7. Run the variant's follow-up probe, if any
//!
//! Every failure along the way skips the branch; nothing aborts the site.

use futures::future::{join_all, BoxFuture, FutureExt};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};
use url::Url;

use crate::config::{CrawlerSettings, SiteSpec};
use crate::content::{
    truncate_preview, ContentProcessor, DocumentFormat, ProcessedContent, TextExtractor,
    PREVIEW_CHARS,
};
use crate::crawler::fetcher::{FetchClient, FetchResult};
use crate::crawler::variant::{CrawlVariant, PageMode};
use crate::state::SiteType;
use crate::storage::{PageEntry, RunLedger};
use crate::url::{extract_domain, is_allowed_url, normalize_url, registered_domain};

/// The collaborators shared by every site crawl of a run
#[derive(Clone)]
pub struct CrawlServices {
    pub processor: Arc<dyn ContentProcessor>,
    pub extractor: Arc<dyn TextExtractor>,
    /// Root output directory; each host gets a subdirectory
    pub output_dir: PathBuf,
    pub ledger: Option<RunLedger>,
}

impl CrawlServices {
    pub fn new(
        processor: Arc<dyn ContentProcessor>,
        extractor: Arc<dyn TextExtractor>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            processor,
            extractor,
            output_dir: output_dir.into(),
            ledger: None,
        }
    }

    pub fn with_ledger(mut self, ledger: RunLedger) -> Self {
        self.ledger = Some(ledger);
        self
    }
}

/// The result of crawling one page
#[derive(Debug, Clone)]
pub struct PageOutcome {
    /// Normalized URL of the page
    pub url: Url,
    pub depth: u32,
    pub content: ProcessedContent,
    /// Text preview, only produced by the PDF variant
    pub extracted_text: Option<String>,
}

/// Crawls a single site
pub struct SiteCrawler {
    site: SiteSpec,
    site_type: SiteType,
    variant: CrawlVariant,
    max_depth: u32,
    allowed_domains: Vec<String>,
    client: Arc<FetchClient>,
    services: CrawlServices,
    visited: Mutex<HashSet<String>>,
    pages_processed: AtomicUsize,
}

impl SiteCrawler {
    /// Creates a crawler for `site` using the variant for `site_type`
    ///
    /// # Arguments
    ///
    /// * `site` - The site being crawled
    /// * `site_type` - The resolved site type
    /// * `settings` - Crawler settings (`max_depth` is read here)
    /// * `client` - This site's fetch client
    /// * `services` - Content collaborators and the ledger
    pub fn new(
        site: SiteSpec,
        site_type: SiteType,
        settings: &CrawlerSettings,
        client: Arc<FetchClient>,
        services: CrawlServices,
    ) -> Self {
        let allowed_domains = site.effective_allowed_domains();

        Self {
            variant: CrawlVariant::for_site_type(site_type),
            site,
            site_type,
            max_depth: settings.max_depth,
            allowed_domains,
            client,
            services,
            visited: Mutex::new(HashSet::new()),
            pages_processed: AtomicUsize::new(0),
        }
    }

    pub fn site(&self) -> &SiteSpec {
        &self.site
    }

    pub fn variant(&self) -> CrawlVariant {
        self.variant
    }

    /// Number of URLs accepted for fetching so far
    pub fn visited_count(&self) -> usize {
        self.visited.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Number of pages fetched and processed so far
    pub fn pages_processed(&self) -> usize {
        self.pages_processed.load(Ordering::Relaxed)
    }

    /// Crawls the site from its configured root URL
    pub async fn crawl_site(&self) -> Option<PageOutcome> {
        let domain = normalize_url(&self.site.url)
            .ok()
            .and_then(|root| registered_domain(&root));
        info!(
            site = %self.site.url,
            domain = domain.as_deref().unwrap_or("unknown"),
            variant = self.variant.as_str(),
            max_depth = self.max_depth,
            "Starting site crawl"
        );
        let outcome = self.crawl(&self.site.url, 0).await;
        info!(
            site = %self.site.url,
            pages = self.pages_processed(),
            "Site crawl finished"
        );
        outcome
    }

    /// Crawls `url` at `depth` with this crawler's variant
    ///
    /// Returns `None` when the page was skipped: too deep, outside the allowed
    /// domains, already visited, failed to fetch, or not applicable to the
    /// variant. Children are crawled before this returns.
    pub fn crawl<'a>(&'a self, url: &'a str, depth: u32) -> BoxFuture<'a, Option<PageOutcome>> {
        async move {
            let behavior = self.variant.behavior();

            let outcome = match behavior.mode {
                PageMode::Traverse => self.crawl_page(url, depth).await,
                PageMode::SingleDocument => self.crawl_document(url, depth).await,
            };

            if let Some(probe) = behavior.follow_up {
                if probe.applies(depth, self.site.include_pdf) {
                    let probe_url = normalize_url(url)
                        .ok()
                        .and_then(|base| base.join(probe.path).ok());
                    if let Some(probe_url) = probe_url {
                        debug!(url = %probe_url, path = probe.path, "Follow-up probe");
                        // Generic path: the probed page does not trigger another probe
                        self.crawl_page(probe_url.as_str(), depth + 1).await;
                    }
                }
            }

            outcome
        }
        .boxed()
    }

    /// Steps 1-3: returns the normalized URL if this call owns the fetch
    fn accept(&self, url: &str, depth: u32) -> Option<Url> {
        if self.client.cancellation_token().is_cancelled() {
            return None;
        }

        if depth > self.max_depth {
            debug!(url = %url, depth, "Depth limit exceeded");
            return None;
        }

        let normalized = match normalize_url(url) {
            Ok(u) => u,
            Err(e) => {
                debug!(url = %url, error = %e, "Skipping unparseable URL");
                return None;
            }
        };

        if !is_allowed_url(&normalized, &self.allowed_domains) {
            debug!(url = %normalized, "Domain not allowed");
            return None;
        }

        let inserted = self
            .visited
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(normalized.to_string());
        if !inserted {
            return None;
        }

        Some(normalized)
    }

    /// The generic page algorithm; child links go back through [`Self::crawl`]
    async fn crawl_page(&self, url: &str, depth: u32) -> Option<PageOutcome> {
        let normalized = self.accept(url, depth)?;
        debug!(url = %normalized, depth, "Crawling");

        let result = self.fetch(&normalized).await?;

        let content = self.process(&normalized, &result).await;

        if result.is_html() {
            let links = match self
                .services
                .processor
                .extract_links(&result.text(), &result.url)
            {
                Ok(links) => links,
                Err(e) => {
                    warn!(url = %normalized, error = %e, "Link extraction failed");
                    Vec::new()
                }
            };

            let page_host = extract_domain(&normalized);
            let children: Vec<String> = links
                .into_iter()
                .filter(|link| extract_domain(link) == page_host)
                .map(|link| link.to_string())
                .collect();

            debug!(url = %normalized, children = children.len(), "Following links");
            join_all(children.iter().map(|link| self.crawl(link, depth + 1))).await;
        }

        Some(PageOutcome {
            url: normalized,
            depth,
            content,
            extracted_text: None,
        })
    }

    /// The single-document algorithm used for PDF sites
    async fn crawl_document(&self, url: &str, depth: u32) -> Option<PageOutcome> {
        if depth > 0 {
            return None;
        }

        let normalized = self.accept(url, depth)?;
        info!(url = %normalized, "Fetching document");

        let result = self.fetch(&normalized).await?;

        if !result.is_pdf() {
            warn!(
                url = %normalized,
                content_type = %result.content_type,
                "Expected a PDF document"
            );
            return None;
        }

        let extracted_text = self
            .services
            .extractor
            .extract_text(DocumentFormat::Pdf, &result.body)
            .await
            .map(|text| truncate_preview(&text, PREVIEW_CHARS));

        let content = self.process(&normalized, &result).await;

        Some(PageOutcome {
            url: normalized,
            depth,
            content,
            extracted_text,
        })
    }

    /// Step 4: fetch, keeping only responses that ended on an allowed host
    async fn fetch(&self, url: &Url) -> Option<FetchResult> {
        let result = match self.client.fetch(url).await {
            Ok(result) => result,
            Err(e) => {
                debug!(url = %url, error = %e, "Fetch produced no result");
                return None;
            }
        };

        if !is_allowed_url(&result.url, &self.allowed_domains) {
            warn!(url = %url, final_url = %result.url, "Redirected outside allowed domains");
            return None;
        }

        Some(result)
    }

    /// Step 5: persist the response and record it in the ledger
    async fn process(&self, url: &Url, result: &FetchResult) -> ProcessedContent {
        let destination = self.destination_for(url);

        let content = match self
            .services
            .processor
            .process_content(result, &destination)
            .await
        {
            Ok(content) => content,
            Err(e) => {
                warn!(url = %url, error = %e, "Content processing failed");
                ProcessedContent::unsaved(result)
            }
        };

        self.pages_processed.fetch_add(1, Ordering::Relaxed);
        self.record(url, &content);
        content
    }

    fn record(&self, url: &Url, content: &ProcessedContent) {
        let Some(ledger) = &self.services.ledger else {
            return;
        };

        let entry = PageEntry {
            site_url: self.site.url.clone(),
            url: url.to_string(),
            site_type: self.site_type,
            status_code: Some(content.status_code),
            content_type: Some(content.content_type.clone()).filter(|c| !c.is_empty()),
            saved_path: content
                .saved_path
                .as_deref()
                .map(|p| p.display().to_string()),
            title: content.title().map(str::to_string),
        };

        if let Err(e) = ledger.record(&entry) {
            warn!(url = %url, error = %e, "Failed to record page in ledger");
        }
    }

    /// `<output_dir>/<host>`; a non-default port is appended as `_<port>`
    fn destination_for(&self, url: &Url) -> PathBuf {
        let host = extract_domain(url).unwrap_or_else(|| "unknown-host".to_string());
        let dir = match url.port() {
            Some(port) => format!("{}_{}", host, port),
            None => host,
        };
        self.services.output_dir.join(dir)
    }
}
