//! Integration tests for the crawl engine
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full fetch, extract, analyze cycle end-to-end with scripted
//! analyzers and in-memory page stores.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use sumi_inquiry::analysis::PageAnalysis;
use sumi_inquiry::config::Config;
use sumi_inquiry::storage::{SqlitePageStore, StorageError, StorageResult};
use sumi_inquiry::{
    CrawlEngine, EngineState, InquiryError, PageAnalyzer, PageStore, StopHandle,
};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Marker that the scripted analyzer treats as an answer
const ANSWER_MARKER: &str = "ANSWER-42";

/// Answers only when the page text contains [`ANSWER_MARKER`]
#[derive(Default)]
struct ScriptedAnalyzer {
    calls: AtomicUsize,
}

#[async_trait]
impl PageAnalyzer for ScriptedAnalyzer {
    async fn analyze(&self, text: &str, _question: Option<&str>) -> PageAnalysis {
        self.calls.fetch_add(1, Ordering::SeqCst);
        PageAnalysis {
            summary: text.chars().take(40).collect(),
            keywords: vec!["test".to_string()],
            answer: text
                .contains(ANSWER_MARKER)
                .then(|| "The answer is 42".to_string()),
        }
    }
}

/// Requests a stop while analyzing the Nth page
struct StoppingAnalyzer {
    stop: StopHandle,
    stop_on_call: usize,
    calls: AtomicUsize,
}

#[async_trait]
impl PageAnalyzer for StoppingAnalyzer {
    async fn analyze(&self, _text: &str, _question: Option<&str>) -> PageAnalysis {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call == self.stop_on_call {
            self.stop.request_stop();
        }
        PageAnalysis::default()
    }
}

/// Stalls on its first call, answers instantly afterwards
#[derive(Default)]
struct SlowFirstAnalyzer {
    calls: AtomicUsize,
}

#[async_trait]
impl PageAnalyzer for SlowFirstAnalyzer {
    async fn analyze(&self, _text: &str, _question: Option<&str>) -> PageAnalysis {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            tokio::time::sleep(Duration::from_secs(5)).await;
        }
        PageAnalysis::default()
    }
}

/// Records every persisted URL
#[derive(Default)]
struct RecordingStore {
    urls: Mutex<Vec<String>>,
}

#[async_trait]
impl PageStore for RecordingStore {
    async fn persist_page(
        &self,
        url: &str,
        _title: &str,
        _summary: &str,
        _keywords: &[String],
    ) -> StorageResult<()> {
        self.urls.lock().unwrap().push(url.to_string());
        Ok(())
    }
}

/// Fails every write
struct FailingStore;

#[async_trait]
impl PageStore for FailingStore {
    async fn persist_page(
        &self,
        _url: &str,
        _title: &str,
        _summary: &str,
        _keywords: &[String],
    ) -> StorageResult<()> {
        Err(StorageError::Database("disk full".to_string()))
    }
}

/// Serves `/p/0` to `/p/{count - 1}`, each linking to the next three pages
struct GeneratedSite {
    count: usize,
}

impl Respond for GeneratedSite {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let id = request
            .url
            .path()
            .trim_start_matches("/p/")
            .parse::<usize>()
            .ok()
            .filter(|id| *id < self.count);

        let Some(id) = id else {
            return ResponseTemplate::new(404);
        };

        let links: String = (id + 1..(id + 4).min(self.count))
            .map(|next| format!(r#"<a href="/p/{}">Page {}</a>"#, next, next))
            .collect();

        html_response(&format!(
            "<html><head><title>Page {}</title></head><body><p>Nothing to see on page {}.</p>{}</body></html>",
            id, id, links
        ))
    }
}

/// Serves a [`GeneratedSite`] but requests a stop while serving one path
struct StopWhileServing {
    site: GeneratedSite,
    stop_path: &'static str,
    stop: StopHandle,
}

impl Respond for StopWhileServing {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        if request.url.path() == self.stop_path {
            self.stop.request_stop();
        }
        self.site.respond(request)
    }
}

/// Creates a test configuration with no politeness delay
fn create_test_config() -> Config {
    let mut config = Config::default();
    config.crawler.request_delay_ms = 0;
    config
}

fn html_response(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body.to_string())
        .insert_header("content-type", "text/html; charset=utf-8")
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<html><head><title>{}</title></head><body>{}</body></html>",
        title, body
    )
}

async fn mount_page(server: &MockServer, route: &str, title: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(html_response(&page(title, body)))
        .mount(server)
        .await;
}

fn engine_with(
    config: &Config,
    analyzer: Arc<dyn PageAnalyzer>,
    store: Option<Arc<dyn PageStore>>,
) -> CrawlEngine {
    CrawlEngine::new(config, analyzer, store).expect("Failed to build engine")
}

#[tokio::test]
async fn test_early_exit_on_answer() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/", "Home", r#"<p>Welcome.</p><a href="/b">Next</a>"#).await;
    mount_page(
        &server,
        "/b",
        "Facts",
        &format!(r#"<p>{}</p><a href="/c">More</a>"#, ANSWER_MARKER),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/c"))
        .respond_with(html_response(&page("C", "<p>Never fetched.</p>")))
        .expect(0)
        .mount(&server)
        .await;

    let store = Arc::new(RecordingStore::default());
    let engine = engine_with(
        &create_test_config(),
        Arc::new(ScriptedAnalyzer::default()),
        Some(store.clone()),
    );

    let outcome = engine
        .crawl(&format!("{}/", base), Some("What is the answer?"), Some(10))
        .await
        .unwrap();

    let found = outcome.found_answer.expect("Expected an answer");
    assert_eq!(found.url, format!("{}/b", base));
    assert_eq!(found.title, "Facts");
    assert_eq!(found.answer, "The answer is 42");

    assert_eq!(outcome.pages_processed, 2);
    assert!(!outcome.stopped);
    assert_eq!(
        outcome.visited,
        vec![format!("{}/", base), format!("{}/b", base)]
    );

    // The answering page ends the job without being persisted
    assert_eq!(*store.urls.lock().unwrap(), vec![format!("{}/", base)]);

    let status = engine.get_status();
    assert!(status.completed);
    assert!(!status.stopped);
    assert_eq!(status.pages_processed, 2);
    assert_eq!(engine.state(), EngineState::Completed);
}

#[tokio::test]
async fn test_answers_ignored_without_question() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/", "Home", r#"<a href="/b">Next</a>"#).await;
    mount_page(
        &server,
        "/b",
        "Facts",
        &format!(r#"<p>{}</p><a href="/c">More</a>"#, ANSWER_MARKER),
    )
    .await;
    mount_page(&server, "/c", "End", "<p>The end.</p>").await;

    let engine = engine_with(
        &create_test_config(),
        Arc::new(ScriptedAnalyzer::default()),
        None,
    );

    let outcome = engine
        .crawl(&format!("{}/", base), None, Some(10))
        .await
        .unwrap();

    assert!(outcome.found_answer.is_none());
    assert_eq!(outcome.pages_processed, 3);
    assert!(!outcome.stopped);
}

#[tokio::test]
async fn test_budget_enforcement() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .respond_with(GeneratedSite { count: 100 })
        .mount(&server)
        .await;

    let analyzer = Arc::new(ScriptedAnalyzer::default());
    let engine = engine_with(&create_test_config(), analyzer.clone(), None);

    let outcome = engine
        .crawl(&format!("{}/p/0", base), Some("Where is the treasure?"), Some(5))
        .await
        .unwrap();

    assert_eq!(outcome.pages_processed, 5);
    assert!(outcome.found_answer.is_none());
    assert!(!outcome.stopped);
    assert_eq!(analyzer.calls.load(Ordering::SeqCst), 5);

    // Breadth-first: the start page's direct links come first
    assert_eq!(
        outcome.visited,
        (0..5)
            .map(|id| format!("{}/p/{}", base, id))
            .collect::<Vec<_>>()
    );

    let status = engine.get_status();
    assert!(status.completed);
    assert!(!status.stopped);
    assert_eq!(status.pages_processed, 5);
    assert_eq!(status.total_pages, 5);
}

#[tokio::test]
async fn test_zero_budget_fetches_nothing() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(html_response(&page("Home", "<p>Hi</p>")))
        .expect(0)
        .mount(&server)
        .await;

    let engine = engine_with(
        &create_test_config(),
        Arc::new(ScriptedAnalyzer::default()),
        None,
    );

    let outcome = engine
        .crawl(&format!("{}/", server.uri()), None, Some(0))
        .await
        .unwrap();

    assert_eq!(outcome.pages_processed, 0);
    assert!(outcome.visited.is_empty());
    assert!(engine.get_status().completed);
}

#[tokio::test]
async fn test_server_error_is_skipped() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        "Home",
        r#"<a href="/broken">Broken</a><a href="/ok">Ok</a>"#,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;
    mount_page(
        &server,
        "/ok",
        "Ok",
        r#"<p>Fine.</p><a href="/broken">Broken again</a>"#,
    )
    .await;

    let engine = engine_with(
        &create_test_config(),
        Arc::new(ScriptedAnalyzer::default()),
        None,
    );

    let outcome = engine
        .crawl(&format!("{}/", base), None, Some(10))
        .await
        .unwrap();

    // The failed URL is dropped and never fetched again
    assert_eq!(outcome.pages_processed, 2);
    assert_eq!(
        outcome.visited,
        vec![format!("{}/", base), format!("{}/ok", base)]
    );
    assert!(!outcome.stopped);
}

#[tokio::test]
async fn test_non_html_and_empty_pages_are_skipped() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        "Home",
        r#"<a href="/logo.png">Logo</a><a href="/blank">Blank</a>"#,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/logo.png"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(vec![0x89, 0x50, 0x4e, 0x47])
                .insert_header("content-type", "image/png"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/blank"))
        .respond_with(html_response("   "))
        .mount(&server)
        .await;

    let engine = engine_with(
        &create_test_config(),
        Arc::new(ScriptedAnalyzer::default()),
        None,
    );

    let outcome = engine
        .crawl(&format!("{}/", base), None, Some(10))
        .await
        .unwrap();

    assert_eq!(outcome.pages_processed, 1);
    assert_eq!(outcome.visited, vec![format!("{}/", base)]);
}

#[tokio::test]
async fn test_timeout_is_skipped() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        "Home",
        r#"<a href="/slow">Slow</a><a href="/fast">Fast</a>"#,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(html_response(&page("Slow", "<p>Late.</p>")).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;
    mount_page(&server, "/fast", "Fast", "<p>Quick.</p>").await;

    let mut config = create_test_config();
    config.fetcher.timeout_secs = 1;

    let engine = engine_with(&config, Arc::new(ScriptedAnalyzer::default()), None);

    let outcome = engine
        .crawl(&format!("{}/", base), None, Some(10))
        .await
        .unwrap();

    assert_eq!(outcome.pages_processed, 2);
    assert!(!outcome.visited.contains(&format!("{}/slow", base)));
    assert!(outcome.visited.contains(&format!("{}/fast", base)));
}

#[tokio::test]
async fn test_origin_containment_and_fragments() {
    let server = MockServer::start().await;
    let other = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .respond_with(html_response(&page("Elsewhere", "<p>Other origin.</p>")))
        .expect(0)
        .mount(&other)
        .await;

    mount_page(
        &server,
        "/",
        "Home",
        &format!(
            r##"<a href="#top">Top</a>
            <a href="/#intro">Intro</a>
            <a href="/about#team">Team</a>
            <a href="/about">About</a>
            <a href="{}/elsewhere">Elsewhere</a>
            <a href="mailto:someone@example.com">Mail</a>
            <a href="javascript:void(0)">Script</a>"##,
            other.uri()
        ),
    )
    .await;
    mount_page(&server, "/about", "About", r#"<a href="/">Home</a>"#).await;

    let engine = engine_with(
        &create_test_config(),
        Arc::new(ScriptedAnalyzer::default()),
        None,
    );

    let outcome = engine
        .crawl(&format!("{}/", base), None, Some(10))
        .await
        .unwrap();

    assert_eq!(
        outcome.visited,
        vec![format!("{}/", base), format!("{}/about", base)]
    );
    assert_eq!(outcome.pages_processed, 2);
}

#[tokio::test]
async fn test_cancellation_after_analysis() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .respond_with(GeneratedSite { count: 50 })
        .mount(&server)
        .await;

    let stop = StopHandle::new();
    let analyzer = Arc::new(StoppingAnalyzer {
        stop: stop.clone(),
        stop_on_call: 2,
        calls: AtomicUsize::new(0),
    });
    let engine = engine_with(&create_test_config(), analyzer.clone(), None)
        .with_stop_handle(stop);

    let outcome = engine
        .crawl(&format!("{}/p/0", base), None, Some(20))
        .await
        .unwrap();

    // The page being analyzed when the stop arrived still counts
    assert!(outcome.stopped);
    assert!(outcome.found_answer.is_none());
    assert_eq!(outcome.pages_processed, 2);
    assert_eq!(analyzer.calls.load(Ordering::SeqCst), 2);

    let status = engine.get_status();
    assert!(status.completed);
    assert!(status.stopped);
    assert_eq!(engine.state(), EngineState::Stopped);
}

#[tokio::test]
async fn test_stop_during_background_crawl() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .respond_with(GeneratedSite { count: 50 })
        .mount(&server)
        .await;

    let mut config = create_test_config();
    config.crawler.request_delay_ms = 60_000;

    let engine = Arc::new(engine_with(
        &config,
        Arc::new(ScriptedAnalyzer::default()),
        None,
    ));

    let job = engine
        .start_crawl(&format!("{}/p/0", base), None, Some(20))
        .unwrap();

    // The first page finishes, then the engine waits out the long delay
    for _ in 0..100 {
        if engine.get_status().pages_processed >= 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    let running = engine.get_status();
    assert_eq!(engine.state(), EngineState::Running);
    assert!(!running.completed);

    engine.request_stop();
    engine.request_stop();

    let outcome = tokio::time::timeout(Duration::from_secs(5), job)
        .await
        .expect("Stop should interrupt the delay")
        .unwrap();

    assert!(outcome.stopped);
    assert_eq!(outcome.pages_processed, 1);

    let status = engine.get_status();
    assert!(status.completed);
    assert!(status.stopped);
    assert_eq!(status.pages_processed, 1);
}

#[tokio::test]
async fn test_second_crawl_rejected_while_running() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .respond_with(html_response(&page("Slow", "<p>Slow page.</p>")).set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;

    let engine = Arc::new(engine_with(
        &create_test_config(),
        Arc::new(ScriptedAnalyzer::default()),
        None,
    ));

    let job = engine
        .start_crawl(&format!("{}/", base), None, Some(1))
        .unwrap();

    let second = engine.crawl(&format!("{}/", base), None, Some(1)).await;
    assert!(matches!(second, Err(InquiryError::CrawlInProgress)));

    let outcome = job.await.unwrap();
    assert_eq!(outcome.pages_processed, 1);

    // The engine is reusable once the job finishes
    let again = engine
        .crawl(&format!("{}/", base), None, Some(1))
        .await
        .unwrap();
    assert_eq!(again.pages_processed, 1);
}

#[tokio::test]
async fn test_status_reads_are_idempotent() {
    let server = MockServer::start().await;
    mount_page(&server, "/", "Home", "<p>Only page.</p>").await;

    let engine = engine_with(
        &create_test_config(),
        Arc::new(ScriptedAnalyzer::default()),
        None,
    );
    engine
        .crawl(&format!("{}/", server.uri()), None, Some(3))
        .await
        .unwrap();

    let first = engine.get_status();
    let second = engine.get_status();
    assert_eq!(first, second);
    assert_eq!(first.pages_processed, 1);
    assert_eq!(first.total_pages, 3);
    assert_eq!(first.current_url, Some(format!("{}/", server.uri())));
}

#[tokio::test]
async fn test_failing_store_does_not_stop_crawl() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/", "Home", r#"<a href="/a">A</a><a href="/b">B</a>"#).await;
    mount_page(&server, "/a", "A", "<p>Page A.</p>").await;
    mount_page(&server, "/b", "B", "<p>Page B.</p>").await;

    let engine = engine_with(
        &create_test_config(),
        Arc::new(ScriptedAnalyzer::default()),
        Some(Arc::new(FailingStore)),
    );

    let outcome = engine
        .crawl(&format!("{}/", base), None, Some(10))
        .await
        .unwrap();

    assert_eq!(outcome.pages_processed, 3);
    assert!(!outcome.stopped);
}

#[tokio::test]
async fn test_pages_persisted_to_sqlite() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/", "Home", r#"<p>Welcome home.</p><a href="/a">A</a>"#).await;
    mount_page(&server, "/a", "Page A", "<p>All about A.</p>").await;

    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("pages.db");
    let store = SqlitePageStore::new(&db_path).unwrap();

    let engine = engine_with(
        &create_test_config(),
        Arc::new(ScriptedAnalyzer::default()),
        Some(Arc::new(store.clone())),
    );
    engine
        .crawl(&format!("{}/", base), None, Some(10))
        .await
        .unwrap();

    assert_eq!(store.count_pages().unwrap(), 2);

    let stored = store
        .get_page(&format!("{}/a", base))
        .unwrap()
        .expect("Page A should be stored");
    assert_eq!(stored.title, "Page A");
    assert_eq!(stored.keywords, vec!["test".to_string()]);
    assert!(stored.summary.contains("All about A."));

    assert_eq!(store.pages_with_keyword("test").unwrap().len(), 2);
}

#[tokio::test]
async fn test_invalid_start_url_rejected() {
    let engine = engine_with(
        &create_test_config(),
        Arc::new(ScriptedAnalyzer::default()),
        None,
    );

    for bad in ["", "example.com/path", "mailto:someone@example.com"] {
        let result = engine.crawl(bad, Some("Anything?"), Some(5)).await;
        assert!(
            matches!(result, Err(InquiryError::InvalidStartUrl(_))),
            "expected {:?} to be rejected",
            bad
        );
    }
    assert_eq!(engine.state(), EngineState::Idle);
}

#[tokio::test]
async fn test_stop_between_fetch_and_analysis_abandons_page() {
    let server = MockServer::start().await;
    let base = server.uri();

    let stop = StopHandle::new();
    Mock::given(method("GET"))
        .respond_with(StopWhileServing {
            site: GeneratedSite { count: 10 },
            stop_path: "/p/1",
            stop: stop.clone(),
        })
        .mount(&server)
        .await;

    let analyzer = Arc::new(ScriptedAnalyzer::default());
    let store = Arc::new(RecordingStore::default());
    let engine = engine_with(&create_test_config(), analyzer.clone(), Some(store.clone()))
        .with_stop_handle(stop);

    let outcome = engine
        .crawl(&format!("{}/p/0", base), None, Some(10))
        .await
        .unwrap();

    // /p/1 was fetched but never analyzed, persisted, or counted
    assert!(outcome.stopped);
    assert_eq!(outcome.pages_processed, 1);
    assert_eq!(outcome.visited, vec![format!("{}/p/0", base)]);
    assert_eq!(analyzer.calls.load(Ordering::SeqCst), 1);
    assert_eq!(*store.urls.lock().unwrap(), vec![format!("{}/p/0", base)]);

    let status = engine.get_status();
    assert!(status.completed);
    assert!(status.stopped);
    assert_eq!(status.pages_processed, 1);
}

#[tokio::test]
async fn test_dropped_crawl_releases_engine() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_page(&server, "/", "Home", "<p>Only page.</p>").await;

    let engine = engine_with(
        &create_test_config(),
        Arc::new(SlowFirstAnalyzer::default()),
        None,
    );

    let timed_out = tokio::time::timeout(
        Duration::from_millis(300),
        engine.crawl(&format!("{}/", base), None, Some(3)),
    )
    .await;
    assert!(timed_out.is_err());

    let status = engine.get_status();
    assert_eq!(engine.state(), EngineState::Stopped);
    assert!(status.completed);
    assert!(status.stopped);

    let outcome = engine
        .crawl(&format!("{}/", base), None, Some(3))
        .await
        .unwrap();
    assert_eq!(outcome.pages_processed, 1);
    assert!(!outcome.stopped);
    assert_eq!(engine.state(), EngineState::Completed);
}

#[tokio::test]
async fn test_aborted_background_crawl_releases_engine() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_page(&server, "/", "Home", "<p>Only page.</p>").await;

    let engine = Arc::new(engine_with(
        &create_test_config(),
        Arc::new(SlowFirstAnalyzer::default()),
        None,
    ));

    let job = engine
        .start_crawl(&format!("{}/", base), None, Some(3))
        .unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    job.abort();
    assert!(job.await.unwrap_err().is_cancelled());

    assert_eq!(engine.state(), EngineState::Stopped);
    assert!(engine.crawl(&format!("{}/", base), None, Some(3)).await.is_ok());
}
