//! Crawler module for fetching and traversing sites
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with retry logic and a per-client politeness delay
//! - Site type resolution (explicit type or detection)
//! - The recursive crawl engine and its per-site-type variants
//! - Supervision of one crawl task per site, with bounded shutdown

mod engine;
mod fetcher;
mod manager;
mod resolver;
mod variant;

pub use engine::{CrawlServices, PageOutcome, SiteCrawler};
pub use fetcher::{
    build_http_client, FetchClient, FetchResult, HttpTransport, HttpTransportFactory,
    RequestFailure, Transport, TransportError, TransportFactory,
};
pub use manager::{CrawlManager, SupervisedTask};
pub use resolver::CrawlResolver;
pub use variant::{CrawlVariant, FollowUpProbe, PageMode, ProbeTrigger, VariantBehavior};
