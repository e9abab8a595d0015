//! Integration tests for the health check
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl, record and detection cycle end-to-end.

use site_pulse::analysis::IssueType;
use site_pulse::config::{
    Config, CrawlerConfig, OutputConfig, ScoringConfig, SiteConfig, UserAgentConfig,
};
use site_pulse::crawler::{reanalyze_run, run_health_check, HealthCheck};
use site_pulse::progress::ProgressEvent;
use site_pulse::state::RunStatus;
use site_pulse::storage::{SqliteStorage, Storage};
use site_pulse::PulseError;
use tempfile::TempDir;
use tokio::sync::broadcast;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration for the given site
fn create_test_config(site_url: &str, db_path: &str) -> Config {
    Config {
        site: SiteConfig {
            url: site_url.to_string(),
        },
        crawler: CrawlerConfig {
            request_delay_ms: 0,
            request_timeout_secs: 5,
            max_attempts: 1,
            retry_backoff_ms: 0,
            ..Default::default()
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        output: OutputConfig {
            database_path: db_path.to_string(),
            report_path: "./test_report.md".to_string(),
        },
        scoring: ScoringConfig::default(),
    }
}

fn open_db(dir: &TempDir) -> (SqliteStorage, String) {
    let db_path = dir.path().join("pulse.db");
    let storage = SqliteStorage::new(&db_path).expect("Failed to open database");
    (storage, db_path.display().to_string())
}

async fn mount_html(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

fn page(title: &str, body: &str) -> String {
    format!(
        r#"<html><head><title>{}</title>
        <meta name="description" content="A page used in integration tests">
        </head><body><h1>{}</h1>{}</body></html>"#,
        title, title, body
    )
}

/// Home links to two pages sharing a title and to a missing page
async fn mount_small_site(server: &MockServer) {
    mount_html(
        server,
        "/",
        page(
            "Welcome to the integration test site",
            r#"<a href="/a">A</a><a href="/b">B</a><a href="/missing">Missing</a>"#,
        ),
    )
    .await;
    mount_html(server, "/a", page("Same title on two pages", r#"<a href="/">Home</a>"#)).await;
    mount_html(server, "/b", page("Same title on two pages", r#"<a href="/">Home</a>"#)).await;
}

fn drain(receiver: &mut broadcast::Receiver<ProgressEvent>) -> Vec<ProgressEvent> {
    let mut events = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn test_full_health_check() {
    let mock_server = MockServer::start().await;
    mount_small_site(&mock_server).await;

    let dir = TempDir::new().unwrap();
    let (mut storage, db_path) = open_db(&dir);
    let base = format!("{}/", mock_server.uri());
    let config = create_test_config(&base, &db_path);

    let (sender, mut receiver) = broadcast::channel(64);
    let outcome = run_health_check(&config, "hash", &mut storage, Some(sender))
        .await
        .expect("Health check failed");

    let run = storage.get_run(outcome.run_id).unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.pages_crawled, 4);
    assert_eq!(storage.count_pages(outcome.run_id).unwrap(), 4);
    assert_eq!(run.health_score, Some(outcome.report.health_score));
    assert!(run.finished_at.is_some());

    let broken: Vec<_> = outcome
        .report
        .issues
        .iter()
        .filter(|i| i.issue_type == IssueType::BrokenInternalLink)
        .collect();
    assert_eq!(broken.len(), 1, "Expected exactly one broken link");
    assert_eq!(broken[0].url, base);

    let duplicates = outcome
        .report
        .issues
        .iter()
        .filter(|i| i.issue_type == IssueType::DuplicateTitle)
        .count();
    assert_eq!(duplicates, 2);

    let events = drain(&mut receiver);
    let terminal: Vec<_> = events.iter().filter(|e| e.is_terminal()).collect();
    assert_eq!(terminal.len(), 1);
    match terminal[0] {
        ProgressEvent::Completed(done) => {
            assert_eq!(done.run_id, outcome.run_id);
            assert_eq!(done.total_urls_crawled, 4);
            assert_eq!(done.health_score, outcome.report.health_score);
        }
        other => panic!("Expected a completion event, got {:?}", other),
    }
}

#[tokio::test]
async fn test_page_cap_is_never_exceeded() {
    let mock_server = MockServer::start().await;
    let links: String = (0..8)
        .map(|i| format!(r#"<a href="/p{}">P{}</a>"#, i, i))
        .collect();
    mount_html(&mock_server, "/", page("Home page with many links to follow", &links)).await;
    for i in 0..8 {
        mount_html(
            &mock_server,
            &format!("/p{}", i),
            page("Leaf page of the capped crawl test", ""),
        )
        .await;
    }

    let dir = TempDir::new().unwrap();
    let (mut storage, db_path) = open_db(&dir);
    let mut config = create_test_config(&mock_server.uri(), &db_path);
    config.crawler.page_cap = 3;

    let outcome = run_health_check(&config, "hash", &mut storage, None)
        .await
        .expect("Health check failed");

    let run = storage.get_run(outcome.run_id).unwrap();
    assert_eq!(run.pages_crawled, 3);
    assert_eq!(storage.count_pages(outcome.run_id).unwrap(), 3);

    // uncrawled targets of a capped run are not reported as orphans
    assert!(!outcome
        .report
        .issues
        .iter()
        .any(|i| i.issue_type == IssueType::OrphanedPage));
}

#[tokio::test]
async fn test_robots_txt_respect() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /admin"),
        )
        .mount(&mock_server)
        .await;
    mount_html(
        &mock_server,
        "/",
        page(
            "Home page of the robots test site",
            r#"<a href="/admin/panel">Admin</a><a href="/public">Public</a>"#,
        ),
    )
    .await;
    mount_html(&mock_server, "/public", page("Public page of the robots test", "")).await;
    mount_html(&mock_server, "/admin/panel", page("Admin", "")).await;

    let dir = TempDir::new().unwrap();
    let (mut storage, db_path) = open_db(&dir);
    let config = create_test_config(&mock_server.uri(), &db_path);

    let outcome = run_health_check(&config, "hash", &mut storage, None)
        .await
        .expect("Health check failed");

    let urls: Vec<_> = storage
        .get_pages(outcome.run_id)
        .unwrap()
        .into_iter()
        .map(|r| r.page.url)
        .collect();
    assert!(urls.iter().any(|u| u.ends_with("/public")));
    assert!(!urls.iter().any(|u| u.contains("/admin")));
}

#[tokio::test]
async fn test_robots_denied_seed_fails_without_retry() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /"))
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let (mut storage, db_path) = open_db(&dir);
    let mut config = create_test_config(&mock_server.uri(), &db_path);
    config.crawler.max_attempts = 3;

    let result = run_health_check(&config, "hash", &mut storage, None).await;
    assert!(matches!(result, Err(PulseError::RobotsDenied { .. })));

    let runs = storage.list_runs(10).unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].status, RunStatus::Failed);
}

#[tokio::test]
async fn test_unreachable_seed_retries_in_fresh_runs() {
    // a port nothing listens on
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let dir = TempDir::new().unwrap();
    let (mut storage, db_path) = open_db(&dir);
    let mut config = create_test_config(&format!("http://127.0.0.1:{}/", port), &db_path);
    config.crawler.max_attempts = 2;

    let (sender, mut receiver) = broadcast::channel(64);
    let result = run_health_check(&config, "hash", &mut storage, Some(sender)).await;
    assert!(matches!(result, Err(PulseError::SeedUnreachable { .. })));

    let runs = storage.list_runs(10).unwrap();
    assert_eq!(runs.len(), 2, "Each attempt should create its own run");
    for run in &runs {
        assert_eq!(run.status, RunStatus::Failed);
        assert!(run.finished_at.is_some());
        // the failed seed fetch is kept as a record
        assert_eq!(storage.count_pages(run.id).unwrap(), 1);
    }

    let failures = drain(&mut receiver)
        .into_iter()
        .filter(|e| matches!(e, ProgressEvent::Failed(_)))
        .count();
    assert_eq!(failures, 2);
}

#[tokio::test]
async fn test_cancelled_check_marks_run_failed() {
    let mock_server = MockServer::start().await;
    mount_small_site(&mock_server).await;

    let dir = TempDir::new().unwrap();
    let (mut storage, db_path) = open_db(&dir);
    let mut config = create_test_config(&mock_server.uri(), &db_path);
    config.crawler.max_attempts = 3;

    let check = HealthCheck::new(&config, "hash");
    check.abort_handle().abort();

    let result = check.run(&mut storage).await;
    assert!(matches!(result, Err(PulseError::Cancelled { .. })));

    let runs = storage.list_runs(10).unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].status, RunStatus::Failed);
}

#[tokio::test]
async fn test_reanalyze_is_idempotent() {
    let mock_server = MockServer::start().await;
    mount_small_site(&mock_server).await;

    let dir = TempDir::new().unwrap();
    let (mut storage, db_path) = open_db(&dir);
    let config = create_test_config(&mock_server.uri(), &db_path);

    let outcome = run_health_check(&config, "hash", &mut storage, None)
        .await
        .expect("Health check failed");

    let again = reanalyze_run(&config, &mut storage, outcome.run_id).unwrap();
    assert_eq!(again.issues, outcome.report.issues);
    assert_eq!(again.health_score, outcome.report.health_score);
    assert_eq!(
        storage.get_issues(outcome.run_id).unwrap().len(),
        outcome.report.issues.len()
    );
}

#[tokio::test]
async fn test_reanalyze_uses_the_runs_own_page_cap() {
    let mock_server = MockServer::start().await;
    let links: String = (0..6)
        .map(|i| format!(r#"<a href="/p{}">P{}</a>"#, i, i))
        .collect();
    mount_html(&mock_server, "/", page("Home page of the capped reanalysis test", &links)).await;
    for i in 0..6 {
        mount_html(
            &mock_server,
            &format!("/p{}", i),
            page("Leaf page of the capped reanalysis test", ""),
        )
        .await;
    }

    let dir = TempDir::new().unwrap();
    let (mut storage, db_path) = open_db(&dir);
    let mut config = create_test_config(&mock_server.uri(), &db_path);
    config.crawler.page_cap = 3;

    let outcome = run_health_check(&config, "hash", &mut storage, None)
        .await
        .expect("Health check failed");
    let run = storage.get_run(outcome.run_id).unwrap();
    assert_eq!(run.summary.and_then(|s| s.page_cap), Some(3));

    // the configured cap changed since the crawl
    config.crawler.page_cap = 1000;
    let again = reanalyze_run(&config, &mut storage, outcome.run_id).unwrap();
    assert_eq!(again.issues, outcome.report.issues);
    assert_eq!(again.health_score, outcome.report.health_score);
    assert!(!again.issues.iter().any(|i| matches!(
        i.issue_type,
        IssueType::OrphanedPage | IssueType::BrokenInternalLink
    )));
}

#[tokio::test]
async fn test_reanalyze_rejects_failed_run() {
    let dir = TempDir::new().unwrap();
    let (mut storage, db_path) = open_db(&dir);
    let config = create_test_config("https://example.com/", &db_path);

    let run_id = storage.create_run("https://example.com/", "hash").unwrap();
    storage.fail_run(run_id).unwrap();

    let result = reanalyze_run(&config, &mut storage, run_id);
    assert!(matches!(
        result,
        Err(PulseError::RunNotAnalyzable {
            status: RunStatus::Failed,
            ..
        })
    ));
}
