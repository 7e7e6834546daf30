//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and run whole site
//! crawls through the manager, over real HTTP.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use sitewise::config::{CrawlerSettings, SiteSpec};
use sitewise::content::{DefaultTextExtractor, FileContentProcessor};
use sitewise::crawler::{CrawlManager, CrawlServices};
use sitewise::state::{SiteType, TaskState};
use sitewise::storage::{RunLedger, RunStatus, SqliteStorage, Storage};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Fast settings for tests
fn test_settings(max_depth: u32) -> CrawlerSettings {
    CrawlerSettings {
        max_depth,
        request_timeout_seconds: 5,
        max_retries: 2,
        retry_delay_seconds: 0.0,
        politeness_delay_seconds: 0.0,
        shutdown_timeout_seconds: 2.0,
        ..CrawlerSettings::default()
    }
}

struct TestRun {
    manager: CrawlManager,
    ledger: RunLedger,
    dir: TempDir,
}

fn start_run(settings: CrawlerSettings) -> TestRun {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let storage = SqliteStorage::new(&dir.path().join("crawl.db")).expect("Failed to open ledger");
    let ledger =
        RunLedger::begin(Arc::new(Mutex::new(storage)), "test").expect("Failed to begin run");

    let services = CrawlServices::new(
        Arc::new(FileContentProcessor::default()),
        Arc::new(DefaultTextExtractor),
        dir.path().join("output"),
    )
    .with_ledger(ledger.clone());

    let manager = CrawlManager::new(settings, services);
    TestRun {
        manager,
        ledger,
        dir,
    }
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body.to_string())
        .insert_header("content-type", "text/html; charset=utf-8")
}

async fn mount_page(server: &MockServer, page: &str, response: ResponseTemplate, times: u64) {
    Mock::given(method("GET"))
        .and(path(page))
        .respond_with(response)
        .expect(times)
        .mount(server)
        .await;
}

/// Output directory name for the mock server, `<host>_<port>`
fn host_dir(server: &MockServer) -> String {
    let url = url::Url::parse(&server.uri()).expect("Failed to parse server URI");
    format!(
        "{}_{}",
        url.host_str().expect("Missing host"),
        url.port().expect("Missing port")
    )
}

#[tokio::test]
async fn test_full_crawl_single_site() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        html(&format!(
            r#"<html><head><title>Home</title></head><body>
            <a href="{base}/page1">Page 1</a>
            <a href="/page2/">Page 2</a>
            <a href="https://elsewhere.invalid/">External</a>
            </body></html>"#
        )),
        1,
    )
    .await;
    mount_page(&server, "/page1", html(r#"<a href="/">Home</a><a href="/page2">2</a>"#), 1).await;
    mount_page(&server, "/page2", html(r#"<a href="/page1#top">1</a>"#), 1).await;

    let run = start_run(test_settings(3));
    let site = SiteSpec::new(base.clone()).with_type("generic");

    let results = run.manager.run_all(&[site]).await;

    assert_eq!(results, vec![(base, TaskState::Completed)]);

    let pages = run.ledger.pages().expect("Failed to read pages");
    assert_eq!(pages.len(), 3);
    assert!(pages.iter().all(|p| p.site_type == SiteType::Generic));
    assert!(pages.iter().any(|p| p.title.as_deref() == Some("Home")));

    let saved = std::fs::read_dir(run.dir.path().join("output").join(host_dir(&server)))
        .expect("Host directory missing")
        .count();
    assert_eq!(saved, 3);
}

#[tokio::test]
async fn test_depth_limit() {
    let server = MockServer::start().await;

    mount_page(&server, "/", html(r#"<a href="/a">a</a>"#), 1).await;
    mount_page(&server, "/a", html(r#"<a href="/b">b</a>"#), 1).await;
    mount_page(&server, "/b", html("<p>too deep</p>"), 0).await;

    let run = start_run(test_settings(1));
    let task = run
        .manager
        .run_site(SiteSpec::new(server.uri()).with_type("generic"))
        .expect("Failed to start site");

    assert_eq!(task.wait().await, TaskState::Completed);
}

#[tokio::test]
async fn test_detected_flask_site_probes_static() {
    let server = MockServer::start().await;

    // Once for detection, once for the crawl
    mount_page(
        &server,
        "/",
        html(r#"<link href="/static/style.css"><a href="/login">login</a>"#),
        2,
    )
    .await;
    mount_page(&server, "/login", html("<form></form>"), 1).await;
    mount_page(&server, "/static", html("<p>assets</p>"), 1).await;

    let run = start_run(test_settings(3));
    let task = run
        .manager
        .run_site(SiteSpec::new(server.uri()))
        .expect("Failed to start site");

    assert_eq!(task.wait().await, TaskState::Completed);

    let pages = run.ledger.pages().expect("Failed to read pages");
    assert_eq!(pages.len(), 3);
    assert!(pages.iter().all(|p| p.site_type == SiteType::Flask));
}

#[tokio::test]
async fn test_explicit_type_skips_detection_probe() {
    let server = MockServer::start().await;

    mount_page(&server, "/", html("<p>docs</p>"), 1).await;
    mount_page(&server, "/_downloads", html("<p>files</p>"), 0).await;

    let run = start_run(test_settings(3));
    let task = run
        .manager
        .run_site(SiteSpec::new(server.uri()).with_type("Sphinx"))
        .expect("Failed to start site");

    assert_eq!(task.wait().await, TaskState::Completed);
}

#[tokio::test]
async fn test_sphinx_include_pdf_probes_downloads() {
    let server = MockServer::start().await;

    mount_page(&server, "/", html(r#"<a href="/guide.html">guide</a>"#), 1).await;
    mount_page(&server, "/guide.html", html("<p>guide</p>"), 1).await;
    mount_page(&server, "/_downloads", html("<p>files</p>"), 1).await;

    let run = start_run(test_settings(3));
    let mut site = SiteSpec::new(server.uri()).with_type("sphinx");
    site.include_pdf = true;

    let task = run.manager.run_site(site).expect("Failed to start site");

    assert_eq!(task.wait().await, TaskState::Completed);
}

#[tokio::test]
async fn test_http_error_is_not_retried_and_contained() {
    let server = MockServer::start().await;

    mount_page(&server, "/", ResponseTemplate::new(500), 1).await;

    let run = start_run(test_settings(3));
    let task = run
        .manager
        .run_site(SiteSpec::new(server.uri()).with_type("generic"))
        .expect("Failed to start site");

    assert_eq!(task.wait().await, TaskState::Completed);
    assert!(run.ledger.pages().expect("Failed to read pages").is_empty());
}

#[tokio::test]
async fn test_cross_host_redirect_is_not_followed() {
    let site = MockServer::start().await;
    let elsewhere = MockServer::start().await;
    let elsewhere_port = url::Url::parse(&elsewhere.uri())
        .expect("Failed to parse server URI")
        .port()
        .expect("Missing port");

    // 127.0.0.1 is allowed, localhost is not
    mount_page(
        &site,
        "/",
        ResponseTemplate::new(302).insert_header(
            "location",
            format!("http://localhost:{elsewhere_port}/landing").as_str(),
        ),
        1,
    )
    .await;
    mount_page(&elsewhere, "/landing", html("<p>off-site</p>"), 0).await;

    let run = start_run(test_settings(3));
    let task = run
        .manager
        .run_site(SiteSpec::new(site.uri()).with_type("generic"))
        .expect("Failed to start site");

    assert_eq!(task.wait().await, TaskState::Completed);
    assert!(run.ledger.pages().expect("Failed to read pages").is_empty());
    assert!(!run.dir.path().join("output").exists());
}

#[tokio::test]
async fn test_failed_detection_does_not_affect_other_sites() {
    let broken = MockServer::start().await;
    let healthy = MockServer::start().await;

    mount_page(&broken, "/", ResponseTemplate::new(503), 1).await;
    mount_page(&healthy, "/", html("<p>ok</p>"), 1).await;

    let run = start_run(test_settings(3));
    let results = run
        .manager
        .run_all(&[
            SiteSpec::new(broken.uri()),
            SiteSpec::new(healthy.uri()).with_type("wordpress"),
        ])
        .await;

    assert_eq!(
        results,
        vec![
            (broken.uri(), TaskState::Failed),
            (healthy.uri(), TaskState::Completed),
        ]
    );
}

#[tokio::test]
async fn test_shutdown_cancels_in_flight_crawl() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        "/",
        html("<p>slow</p>").set_delay(Duration::from_secs(10)),
        1,
    )
    .await;

    let run = start_run(test_settings(3));
    let task = run
        .manager
        .run_site(SiteSpec::new(server.uri()).with_type("generic"))
        .expect("Failed to start site");

    tokio::time::sleep(Duration::from_millis(200)).await;
    let started = std::time::Instant::now();
    run.manager.shutdown().await;

    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(task.wait().await, TaskState::Cancelled);
    assert!(run.manager.is_shutting_down());

    // Nothing new starts once shutdown has begun
    assert!(run
        .manager
        .run_site(SiteSpec::new(server.uri()).with_type("generic"))
        .is_err());

    run.ledger
        .finish(RunStatus::Interrupted)
        .expect("Failed to finish run");
    let storage = SqliteStorage::new(&run.dir.path().join("crawl.db")).expect("Failed to reopen");
    let latest = storage
        .get_latest_run()
        .expect("Failed to query runs")
        .expect("Run missing");
    assert_eq!(latest.status, RunStatus::Interrupted);
}
