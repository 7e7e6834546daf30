//! HTTP fetch client
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with the configured user agent and timeout
//! - The per-client politeness delay between requests
//! - Retry logic for transport failures
//! - Error classification
//!
//! The network itself sits behind the [`Transport`] trait so the retry and
//! throttling rules can be exercised without a server.

use crate::config::CrawlerSettings;
use async_trait::async_trait;
use crate::url::is_allowed_host;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::redirect::Policy;
use reqwest::Client;
use std::borrow::Cow;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

/// A successfully received HTTP response
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// Final URL after redirects
    pub url: Url,
    /// HTTP status code
    pub status_code: u16,
    /// Raw response body
    pub body: Vec<u8>,
    /// Content-Type header value (empty when absent)
    pub content_type: String,
    /// All response headers
    pub headers: HeaderMap,
}

impl FetchResult {
    /// Creates a result with no headers besides Content-Type
    pub fn new(url: Url, status_code: u16, content_type: &str, body: impl Into<Vec<u8>>) -> Self {
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(content_type) {
            headers.insert(CONTENT_TYPE, value);
        }
        Self {
            url,
            status_code,
            body: body.into(),
            content_type: content_type.to_string(),
            headers,
        }
    }

    /// Appends a header; invalid names or values are ignored
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    /// Returns true for 2xx responses
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    pub fn is_html(&self) -> bool {
        self.content_type.to_ascii_lowercase().contains("text/html")
    }

    pub fn is_pdf(&self) -> bool {
        self.content_type
            .to_ascii_lowercase()
            .contains("application/pdf")
    }

    /// Returns the body decoded as UTF-8, replacing invalid sequences
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Checks whether any value of a header contains `needle` (case-insensitive)
    pub fn header_contains(&self, name: &str, needle: &str) -> bool {
        let needle = needle.to_ascii_lowercase();
        self.headers
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .any(|v| v.to_ascii_lowercase().contains(&needle))
    }
}

/// Failure of a single transport attempt
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Request timeout")]
    Timeout,

    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        // Classify error
        if e.is_timeout() {
            TransportError::Timeout
        } else if e.is_connect() {
            TransportError::Connect(e.to_string())
        } else {
            TransportError::Other(e.to_string())
        }
    }
}

/// Why a logical fetch produced no result
#[derive(Debug, Error)]
pub enum RequestFailure {
    #[error("HTTP {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("{url} failed after {attempts} attempt(s): {message}")]
    Transport {
        url: String,
        attempts: u32,
        message: String,
    },

    #[error("Request cancelled")]
    Cancelled,

    #[error("Fetch client is closed")]
    Closed,
}

/// A single HTTP GET attempt
///
/// Implementations return any response the server sent, whatever its status;
/// status handling belongs to [`FetchClient`].
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &Url) -> Result<FetchResult, TransportError>;
}

/// Opens a new transport session for one crawl task
///
/// A session never follows a redirect to a host outside `allowed_domains`.
pub trait TransportFactory: Send + Sync {
    fn open(
        &self,
        settings: &CrawlerSettings,
        allowed_domains: &[String],
    ) -> Result<Arc<dyn Transport>, TransportError>;
}

/// Redirect hops allowed per request, as reqwest's default policy
const MAX_REDIRECTS: usize = 10;

/// Follows a redirect only while its target host is allowed
///
/// A refused hop hands the 3xx response back to the caller, where it fails as
/// a non-success status.
fn redirect_policy(allowed_domains: &[String]) -> Policy {
    let allowed = allowed_domains.to_vec();

    Policy::custom(move |attempt| {
        if attempt.previous().len() >= MAX_REDIRECTS {
            return attempt.stop();
        }

        let permitted = attempt
            .url()
            .host_str()
            .map(|host| is_allowed_host(&host.to_ascii_lowercase(), &allowed))
            .unwrap_or(false);

        if permitted {
            attempt.follow()
        } else {
            debug!(target_url = %attempt.url(), "Redirect leaves allowed domains, not followed");
            attempt.stop()
        }
    })
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `settings` - The crawler settings (user agent and request timeout)
/// * `allowed_domains` - Domain patterns a redirect may lead to
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use sitewise::config::CrawlerSettings;
/// use sitewise::crawler::build_http_client;
///
/// let allowed = vec!["example.com".to_string()];
/// let client = build_http_client(&CrawlerSettings::default(), &allowed).unwrap();
/// ```
pub fn build_http_client(
    settings: &CrawlerSettings,
    allowed_domains: &[String],
) -> Result<Client, reqwest::Error> {
    let timeout = settings.request_timeout();

    Client::builder()
        .user_agent(settings.user_agent.as_str())
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .gzip(true)
        .brotli(true)
        .redirect(redirect_policy(allowed_domains))
        .build()
}

/// reqwest-backed [`Transport`]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(settings: &CrawlerSettings, allowed_domains: &[String]) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(settings, allowed_domains)?,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &Url) -> Result<FetchResult, TransportError> {
        let response = self.client.get(url.clone()).send().await?;

        let status_code = response.status().as_u16();
        let final_url = response.url().clone();
        let headers = response.headers().clone();
        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        // The body of an error response is never looked at
        let body = if response.status().is_success() {
            response.bytes().await?.to_vec()
        } else {
            Vec::new()
        };

        Ok(FetchResult {
            url: final_url,
            status_code,
            body,
            content_type,
            headers,
        })
    }
}

/// Opens a fresh [`HttpTransport`] (and connection pool) per task
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpTransportFactory;

impl TransportFactory for HttpTransportFactory {
    fn open(
        &self,
        settings: &CrawlerSettings,
        allowed_domains: &[String],
    ) -> Result<Arc<dyn Transport>, TransportError> {
        Ok(Arc::new(HttpTransport::new(settings, allowed_domains)?))
    }
}

/// Issues logical GETs with bounded retries and a politeness delay
///
/// # Request Flow
///
/// 1. Wait until `politeness_delay` has passed since this client's previous request completed
/// 2. Attempt the GET up to `max_retries` times
///
/// # Retry Logic
///
/// | Condition | Action |
/// |-----------|--------|
/// | 2xx | Return the response |
/// | Any other status | Immediate → `HttpStatus` |
/// | Timeout / connection / body error | Retry after `retry_delay` |
/// | Attempts exhausted | → `Transport` |
/// | Cancellation observed | Immediate → `Cancelled` |
///
/// Each client owns its throttle; two clients never delay each other. The
/// session is released by [`FetchClient::close`], after which every fetch
/// fails with `Closed`.
pub struct FetchClient {
    session: Mutex<Option<Arc<dyn Transport>>>,
    max_retries: u32,
    retry_delay: Duration,
    politeness_delay: Duration,
    last_request: tokio::sync::Mutex<Option<Instant>>,
    cancel: CancellationToken,
    attempts: AtomicU64,
}

impl FetchClient {
    /// Creates a client over the given transport session
    ///
    /// # Arguments
    ///
    /// * `transport` - The session used for every attempt
    /// * `settings` - Retry count and delays
    /// * `cancel` - Token observed at every suspension point
    pub fn new(
        transport: Arc<dyn Transport>,
        settings: &CrawlerSettings,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            session: Mutex::new(Some(transport)),
            max_retries: settings.max_retries.max(1),
            retry_delay: settings.retry_delay(),
            politeness_delay: settings.politeness_delay(),
            last_request: tokio::sync::Mutex::new(None),
            cancel,
            attempts: AtomicU64::new(0),
        }
    }

    /// Creates a client with a new HTTP session
    pub fn http(
        settings: &CrawlerSettings,
        allowed_domains: &[String],
        cancel: CancellationToken,
    ) -> Result<Self, TransportError> {
        let transport = HttpTransportFactory.open(settings, allowed_domains)?;
        Ok(Self::new(transport, settings, cancel))
    }

    /// Fetches a URL with politeness delay and retry logic
    ///
    /// # Arguments
    ///
    /// * `url` - The URL to fetch
    ///
    /// # Returns
    ///
    /// * `Ok(FetchResult)` - A 2xx response
    /// * `Err(RequestFailure)` - No usable response; never retried by the caller
    pub async fn fetch(&self, url: &Url) -> Result<FetchResult, RequestFailure> {
        let transport = self.session().ok_or(RequestFailure::Closed)?;

        // Held until this fetch completes, so the next request on this client
        // starts no sooner than `politeness_delay` after this one finished
        let mut last_request = self.wait_politely().await?;

        let mut last_error = String::new();
        for attempt in 1..=self.max_retries {
            if self.cancel.is_cancelled() {
                return Err(RequestFailure::Cancelled);
            }

            self.attempts.fetch_add(1, Ordering::Relaxed);
            let outcome = tokio::select! {
                _ = self.cancel.cancelled() => return Err(RequestFailure::Cancelled),
                outcome = transport.get(url) => outcome,
            };

            match outcome {
                Ok(result) => {
                    *last_request = Some(Instant::now());

                    if !result.is_success() {
                        warn!(url = %url, status = result.status_code, "Non-success status");
                        return Err(RequestFailure::HttpStatus {
                            url: url.to_string(),
                            status: result.status_code,
                        });
                    }

                    debug!(url = %url, status = result.status_code, attempt, "Fetched");
                    return Ok(result);
                }
                Err(e) => {
                    warn!(
                        url = %url,
                        attempt,
                        max_attempts = self.max_retries,
                        error = %e,
                        "Request attempt failed"
                    );
                    last_error = e.to_string();

                    if attempt < self.max_retries {
                        tokio::select! {
                            _ = self.cancel.cancelled() => return Err(RequestFailure::Cancelled),
                            _ = tokio::time::sleep(self.retry_delay) => {}
                        }
                    }
                }
            }
        }

        *last_request = Some(Instant::now());
        Err(RequestFailure::Transport {
            url: url.to_string(),
            attempts: self.max_retries,
            message: last_error,
        })
    }

    /// Releases the transport session
    ///
    /// Requests already in flight finish on their own handle; later fetches fail
    /// with `Closed`. Closing twice is a no-op.
    pub fn close(&self) {
        if self.lock_session().take().is_some() {
            debug!("Fetch client session released");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.lock_session().is_none()
    }

    /// Total transport attempts made by this client
    pub fn attempts_made(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }

    /// The token this client observes
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    fn session(&self) -> Option<Arc<dyn Transport>> {
        self.lock_session().clone()
    }

    fn lock_session(&self) -> MutexGuard<'_, Option<Arc<dyn Transport>>> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Suspends until the politeness delay has elapsed since the previous
    /// request completed, then hands back the throttle
    ///
    /// Concurrent callers on this client queue on the lock.
    async fn wait_politely(
        &self,
    ) -> Result<tokio::sync::MutexGuard<'_, Option<Instant>>, RequestFailure> {
        let last = tokio::select! {
            _ = self.cancel.cancelled() => return Err(RequestFailure::Cancelled),
            last = self.last_request.lock() => last,
        };

        if let Some(previous) = *last {
            let ready_at = previous + self.politeness_delay;
            if ready_at > Instant::now() {
                tokio::select! {
                    _ = self.cancel.cancelled() => return Err(RequestFailure::Cancelled),
                    _ = tokio::time::sleep_until(ready_at) => {}
                }
            }
        }

        Ok(last)
    }
}
