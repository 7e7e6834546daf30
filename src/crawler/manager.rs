//! Crawl manager
//!
//! The manager owns every running site crawl. Each site runs as its own
//! supervised tokio task with a child of the manager's shutdown token, its own
//! [`FetchClient`] and its own [`SiteCrawler`]; nothing is shared between sites
//! except the content services and the ledger.
//!
//! # Task Lifecycle
//!
//! ```text
//! Pending -> Running -> Completed
//!                    -> Cancelled   (shutdown observed)
//!                    -> Failed      (error or panic)
//! ```
//!
//! Each task publishes its state on a `watch` channel. A task is registered in
//! the live set before it starts and removed once it reaches a terminal state.
//!
//! # Shutdown
//!
//! [`CrawlManager::shutdown`] runs once: it cancels the root token, which every
//! task token descends from, then waits for live tasks to reach a terminal state
//! for at most `shutdown-timeout-seconds`. Tasks still running after that are
//! abandoned and logged, never aborted.

use futures::future::join_all;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::{CrawlerSettings, SiteSpec};
use crate::crawler::engine::{CrawlServices, SiteCrawler};
use crate::crawler::fetcher::{FetchClient, HttpTransportFactory, TransportFactory};
use crate::crawler::resolver::CrawlResolver;
use crate::detect::SiteDetector;
use crate::state::TaskState;
use crate::SitewiseError;

/// A registered task, as seen by shutdown
struct LiveTask {
    label: String,
    token: CancellationToken,
    state: watch::Receiver<TaskState>,
}

type LiveTasks = Arc<Mutex<HashMap<u64, LiveTask>>>;

fn lock_tasks(tasks: &Mutex<HashMap<u64, LiveTask>>) -> MutexGuard<'_, HashMap<u64, LiveTask>> {
    tasks.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Removes a task from the live set when its supervisor finishes
struct Registration {
    tasks: LiveTasks,
    id: u64,
}

impl Drop for Registration {
    fn drop(&mut self) {
        lock_tasks(&self.tasks).remove(&self.id);
    }
}

/// Handle to a supervised task
pub struct SupervisedTask {
    label: String,
    state: watch::Receiver<TaskState>,
}

impl SupervisedTask {
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Current state, without waiting
    pub fn state(&self) -> TaskState {
        *self.state.borrow()
    }

    /// Waits until the task reaches a terminal state
    pub async fn wait(mut self) -> TaskState {
        let finished = self
            .state
            .wait_for(TaskState::is_terminal)
            .await
            .map(|state| *state);
        finished.unwrap_or_else(|_| *self.state.borrow())
    }
}

struct ManagerInner {
    settings: CrawlerSettings,
    services: CrawlServices,
    factory: Arc<dyn TransportFactory>,
    shutdown: CancellationToken,
    shutdown_done: tokio::sync::Mutex<bool>,
    tasks: LiveTasks,
    next_id: AtomicU64,
}

/// Supervises one crawl task per site
///
/// Cloning is cheap; clones share the same live set and shutdown state.
#[derive(Clone)]
pub struct CrawlManager {
    inner: Arc<ManagerInner>,
}

impl CrawlManager {
    /// Creates a manager that crawls over HTTP
    ///
    /// # Arguments
    ///
    /// * `settings` - Crawler settings shared by every task
    /// * `services` - Content collaborators and the run ledger
    pub fn new(settings: CrawlerSettings, services: CrawlServices) -> Self {
        Self::with_transport_factory(settings, services, Arc::new(HttpTransportFactory))
    }

    /// Creates a manager whose sessions come from `factory`
    ///
    /// The factory opens one session per site task, scoped to that site's
    /// allowed domains. No session is held outside a running task.
    pub fn with_transport_factory(
        settings: CrawlerSettings,
        services: CrawlServices,
        factory: Arc<dyn TransportFactory>,
    ) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                settings,
                services,
                factory,
                shutdown: CancellationToken::new(),
                shutdown_done: tokio::sync::Mutex::new(false),
                tasks: Arc::new(Mutex::new(HashMap::new())),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    pub fn settings(&self) -> &CrawlerSettings {
        &self.inner.settings
    }

    /// Returns true once shutdown has been requested
    pub fn is_shutting_down(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }

    /// Labels of the tasks currently in the live set
    pub fn active_tasks(&self) -> Vec<String> {
        let mut labels: Vec<String> = lock_tasks(&self.inner.tasks)
            .values()
            .map(|task| task.label.clone())
            .collect();
        labels.sort();
        labels
    }

    /// Resolves when shutdown has been requested
    pub async fn wait_for_shutdown(&self) {
        self.inner.shutdown.cancelled().await
    }

    /// Starts `job` as a supervised task
    ///
    /// The job receives the task's cancellation token. Its result decides the
    /// terminal state: `Ok` is `Completed` (or `Cancelled` if the token fired),
    /// `Err` and panics are `Failed`. Sibling tasks are never affected.
    ///
    /// # Returns
    ///
    /// * `Ok(SupervisedTask)` - The task is registered and running
    /// * `Err(SitewiseError::ShuttingDown)` - Shutdown was requested; nothing started
    pub fn supervise<F, Fut>(
        &self,
        label: impl Into<String>,
        job: F,
    ) -> Result<SupervisedTask, SitewiseError>
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), SitewiseError>> + Send + 'static,
    {
        let label = label.into();
        let (state_tx, state_rx) = watch::channel(TaskState::Pending);

        let (id, token) = {
            let mut tasks = lock_tasks(&self.inner.tasks);
            if self.is_shutting_down() {
                return Err(SitewiseError::ShuttingDown(label));
            }

            let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
            let token = self.inner.shutdown.child_token();
            tasks.insert(
                id,
                LiveTask {
                    label: label.clone(),
                    token: token.clone(),
                    state: state_rx.clone(),
                },
            );
            (id, token)
        };

        let registration = Registration {
            tasks: Arc::clone(&self.inner.tasks),
            id,
        };

        state_tx.send_replace(TaskState::Running);
        debug!(task = %label, "Task started");
        let handle = tokio::spawn(job(token.clone()));

        let task_label = label.clone();
        tokio::spawn(async move {
            let _registration = registration;

            let state = match handle.await {
                Ok(Ok(())) if token.is_cancelled() => TaskState::Cancelled,
                Ok(Ok(())) => TaskState::Completed,
                Ok(Err(e)) => {
                    error!(task = %task_label, error = %e, "Crawl task failed");
                    TaskState::Failed
                }
                Err(join_error) => {
                    let failure = SitewiseError::TaskFailed {
                        label: task_label.clone(),
                        message: join_error.to_string(),
                    };
                    error!(error = %failure, "Crawl task terminated abnormally");
                    TaskState::Failed
                }
            };

            info!(task = %task_label, state = %state, "Task finished");
            state_tx.send_replace(state);
        });

        Ok(SupervisedTask {
            label,
            state: state_rx,
        })
    }

    /// Starts the crawl of one site
    ///
    /// The task opens its own fetch session, resolves the site type over it and
    /// crawls from the root URL at depth 0. Its session is closed before the task
    /// ends, including when detection fails or the task is cancelled.
    pub fn run_site(&self, site: SiteSpec) -> Result<SupervisedTask, SitewiseError> {
        let inner = Arc::clone(&self.inner);
        let label = site.url.clone();

        self.supervise(label, move |token| crawl_one_site(inner, site, token))
    }

    /// Crawls every site and waits for all of them
    ///
    /// Sites start in the given order. A site that could not be started because
    /// shutdown was requested is reported as `Cancelled`.
    pub async fn run_all(&self, sites: &[SiteSpec]) -> Vec<(String, TaskState)> {
        let mut started = Vec::with_capacity(sites.len());
        let mut skipped = Vec::new();

        for (index, site) in sites.iter().enumerate() {
            match self.run_site(site.clone()) {
                Ok(task) => started.push((index, task)),
                Err(e) => {
                    warn!(site = %site.url, error = %e, "Site not started");
                    skipped.push((index, site.url.clone()));
                }
            }
        }

        let finished = join_all(started.into_iter().map(|(index, task)| async move {
            let label = task.label().to_string();
            (index, label, task.wait().await)
        }))
        .await;

        let mut results: Vec<(usize, String, TaskState)> = finished;
        results.extend(
            skipped
                .into_iter()
                .map(|(index, url)| (index, url, TaskState::Cancelled)),
        );
        results.sort_by_key(|(index, _, _)| *index);
        results
            .into_iter()
            .map(|(_, label, state)| (label, state))
            .collect()
    }

    /// Cancels every task and waits for them, bounded by the shutdown timeout
    ///
    /// Safe to call more than once and from several tasks at a time; only the
    /// first call runs the sequence and the others wait for it to finish.
    pub async fn shutdown(&self) {
        let mut done = self.inner.shutdown_done.lock().await;
        if *done {
            return;
        }

        let live: Vec<(String, watch::Receiver<TaskState>)> = {
            let tasks = lock_tasks(&self.inner.tasks);
            self.inner.shutdown.cancel();
            tasks
                .values()
                .map(|task| {
                    task.token.cancel();
                    (task.label.clone(), task.state.clone())
                })
                .collect()
        };

        info!(tasks = live.len(), "Shutting down crawl tasks");

        let timeout = self.inner.settings.shutdown_timeout();
        let waits = live.iter().cloned().map(|(_, mut state)| async move {
            let _ = state.wait_for(TaskState::is_terminal).await;
        });

        if tokio::time::timeout(timeout, join_all(waits)).await.is_err() {
            let abandoned: Vec<String> = live
                .iter()
                .filter(|(_, state)| !state.borrow().is_terminal())
                .map(|(label, _)| label.clone())
                .collect();
            warn!(
                timeout_secs = timeout.as_secs_f64(),
                abandoned = ?abandoned,
                "Shutdown timed out, abandoning tasks"
            );
        }

        *done = true;
        info!("Shutdown complete");
    }
}

/// The body of a site task
///
/// One session serves both the detection fetch and the crawl, so both honor the
/// site's allowed domains and politeness delay. It is closed on every path out.
async fn crawl_one_site(
    inner: Arc<ManagerInner>,
    site: SiteSpec,
    token: CancellationToken,
) -> Result<(), SitewiseError> {
    let transport = inner
        .factory
        .open(&inner.settings, &site.effective_allowed_domains())
        .map_err(|e| SitewiseError::TaskFailed {
            label: site.url.clone(),
            message: e.to_string(),
        })?;
    let client = Arc::new(FetchClient::new(transport, &inner.settings, token.clone()));
    let resolver = CrawlResolver::new(SiteDetector::with_default_strategies(Arc::clone(&client)));

    let outcome = resolve_and_crawl(&inner, &resolver, site, client, &token).await;
    resolver.close();
    outcome
}

async fn resolve_and_crawl(
    inner: &ManagerInner,
    resolver: &CrawlResolver,
    site: SiteSpec,
    client: Arc<FetchClient>,
    token: &CancellationToken,
) -> Result<(), SitewiseError> {
    let site_type = tokio::select! {
        _ = token.cancelled() => return Ok(()),
        resolved = resolver.resolve(&site) => resolved?,
    };

    let crawler = SiteCrawler::new(
        site,
        site_type,
        &inner.settings,
        client,
        inner.services.clone(),
    );

    tokio::select! {
        _ = token.cancelled() => {
            info!(site = %crawler.site().url, "Crawl cancelled");
        }
        _ = crawler.crawl_site() => {}
    }

    info!(
        site = %crawler.site().url,
        variant = crawler.variant().as_str(),
        pages = crawler.pages_processed(),
        "Site task done"
    );
    Ok(())
}
