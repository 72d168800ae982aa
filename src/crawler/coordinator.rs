//! Crawl engine - main crawl orchestration logic
//!
//! This module contains the crawl loop that coordinates one job:
//! - Seeding the frontier from the start URL
//! - Fetching, extracting and analyzing one page at a time
//! - Early exit when a page answers the job's question
//! - Best-effort persistence of analyzed pages
//! - Cooperative cancellation and progress reporting

use crate::analysis::{truncate_for_analysis, PageAnalyzer};
use crate::config::Config;
use crate::crawler::extractor::extract_page;
use crate::crawler::{build_http_client, fetch_url, FetchResult};
use crate::state::{
    CrawlJob, CrawlOutcome, CrawlStatus, EngineState, FoundAnswer, PageResult, StatusReporter,
    StopHandle,
};
use crate::storage::PageStore;
use crate::url::parse_start_url;
use crate::InquiryError;
use reqwest::Client;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use url::Url;

/// What happened to one dequeued URL
enum PageOutcome {
    /// Fetch failed; the URL is dropped for the rest of the job
    Skipped,
    /// A stop was requested after the fetch; the page is abandoned
    Cancelled,
    /// The page went through the whole pipeline
    Analyzed(PageResult),
}

/// Claim on the engine held for the lifetime of one job
///
/// Dropping the lease releases the engine. A job that never reached its normal
/// end (its future was dropped, aborted, or a collaborator panicked) is marked
/// stopped first, so the status never stays `Running`.
struct JobLease {
    running: Arc<AtomicBool>,
    status: StatusReporter,
}

impl Drop for JobLease {
    fn drop(&mut self) {
        // No-op when the job already finished normally
        self.status.finish(true);
        self.running.store(false, Ordering::Release);
    }
}

/// Single-origin, breadth-first crawl engine
///
/// One job runs at a time per engine. Status reads and stop requests are safe
/// from any task while a job runs.
pub struct CrawlEngine {
    client: Client,
    analyzer: Arc<dyn PageAnalyzer>,
    store: Option<Arc<dyn PageStore>>,
    status: StatusReporter,
    stop: StopHandle,
    running: Arc<AtomicBool>,
    default_max_pages: usize,
    request_delay: Duration,
    max_input_chars: usize,
}

impl CrawlEngine {
    /// Creates a new engine
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `analyzer` - Text-analysis collaborator
    /// * `store` - Optional page store; `None` disables persistence
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlEngine)` - Successfully created engine
    /// * `Err(InquiryError)` - The HTTP client could not be built
    pub fn new(
        config: &Config,
        analyzer: Arc<dyn PageAnalyzer>,
        store: Option<Arc<dyn PageStore>>,
    ) -> Result<Self, InquiryError> {
        let client = build_http_client(&config.fetcher)?;

        Ok(Self {
            client,
            analyzer,
            store,
            status: StatusReporter::new(),
            stop: StopHandle::new(),
            running: Arc::new(AtomicBool::new(false)),
            default_max_pages: config.crawler.max_pages,
            request_delay: Duration::from_millis(config.crawler.request_delay_ms),
            max_input_chars: config.analyzer.max_input_chars,
        })
    }

    /// Shares an externally created stop handle with this engine
    pub fn with_stop_handle(mut self, stop: StopHandle) -> Self {
        self.stop = stop;
        self
    }

    /// Page budget used when the caller passes none
    pub fn default_max_pages(&self) -> usize {
        self.default_max_pages
    }

    /// Returns a snapshot of the current crawl status
    pub fn get_status(&self) -> CrawlStatus {
        self.status.snapshot()
    }

    /// Returns a reader that can be polled from other tasks
    pub fn status_reporter(&self) -> StatusReporter {
        self.status.clone()
    }

    pub fn state(&self) -> EngineState {
        self.status.state()
    }

    /// Returns a handle that can stop the running job from other tasks
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Requests that the running job stop; idempotent
    ///
    /// The page in flight finishes its fetch or analysis; no new page starts.
    pub fn request_stop(&self) {
        tracing::info!("Stop requested");
        self.stop.request_stop();
    }

    /// Runs a crawl to completion
    ///
    /// # Arguments
    ///
    /// * `start_url` - Absolute http(s) URL; its origin bounds the crawl
    /// * `question` - When set, the crawl stops at the first page answering it
    /// * `max_pages` - Page budget; `None` uses the configured default
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlOutcome)` - The job finished (completed or stopped)
    /// * `Err(InquiryError)` - The start URL is malformed or a job is already running
    ///
    /// # Example
    ///
    /// ```no_run
    /// use std::sync::Arc;
    /// use sumi_inquiry::analysis::ChatAnalyzer;
    /// use sumi_inquiry::config::Config;
    /// use sumi_inquiry::crawler::CrawlEngine;
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let config = Config::default();
    /// let analyzer = Arc::new(ChatAnalyzer::new(&config.analyzer, "api-key")?);
    /// let engine = CrawlEngine::new(&config, analyzer, None)?;
    ///
    /// let outcome = engine
    ///     .crawl("https://example.com/", Some("Who runs this site?"), Some(20))
    ///     .await?;
    /// if let Some(found) = outcome.found_answer {
    ///     println!("{} ({})", found.answer, found.url);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn crawl(
        &self,
        start_url: &str,
        question: Option<&str>,
        max_pages: Option<usize>,
    ) -> Result<CrawlOutcome, InquiryError> {
        let (job, lease) = self.prepare_job(start_url, question, max_pages)?;
        Ok(self.run_job(job, lease).await)
    }

    /// Starts a crawl on a background task
    ///
    /// The start URL is validated before this returns; progress is then
    /// observed through [`CrawlEngine::get_status`] and the outcome through
    /// the returned handle.
    pub fn start_crawl(
        self: &Arc<Self>,
        start_url: &str,
        question: Option<&str>,
        max_pages: Option<usize>,
    ) -> Result<JoinHandle<CrawlOutcome>, InquiryError> {
        let (job, lease) = self.prepare_job(start_url, question, max_pages)?;
        let engine = Arc::clone(self);
        Ok(tokio::spawn(async move { engine.run_job(job, lease).await }))
    }

    /// Validates input, claims the engine and resets status for a fresh job
    fn prepare_job(
        &self,
        start_url: &str,
        question: Option<&str>,
        max_pages: Option<usize>,
    ) -> Result<(CrawlJob, JobLease), InquiryError> {
        let start_url = parse_start_url(start_url)?;

        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(InquiryError::CrawlInProgress);
        }
        let lease = JobLease {
            running: Arc::clone(&self.running),
            status: self.status.clone(),
        };

        let max_pages = max_pages.unwrap_or(self.default_max_pages);
        let job = CrawlJob::new(start_url, question, max_pages);

        self.stop.reset();
        self.status.begin(max_pages, job.start_url().as_str());

        Ok((job, lease))
    }

    /// Runs the main crawl loop
    async fn run_job(&self, mut job: CrawlJob, lease: JobLease) -> CrawlOutcome {
        tracing::info!(
            "Starting crawl of {} (max pages: {}, question: {})",
            job.start_url(),
            job.max_pages(),
            job.question().unwrap_or("none")
        );

        let start_time = Instant::now();
        let mut pages_processed = 0;
        let mut stopped = false;

        loop {
            if self.stop.is_requested() {
                tracing::info!("Stopping crawl as requested");
                stopped = true;
                break;
            }

            if job.budget_exhausted() {
                tracing::info!("Page budget of {} reached", job.max_pages());
                break;
            }

            let url = match job.next_url() {
                Some(url) => url,
                None => {
                    tracing::info!("Frontier is empty, crawl complete");
                    break;
                }
            };

            if job.is_settled(&url) {
                continue;
            }

            self.status.set_current_url(url.as_str());
            tracing::debug!(
                "Processing {} ({}/{})",
                url,
                job.visited_count() + 1,
                job.max_pages()
            );

            let page = match self.process_url(&job, &url).await {
                PageOutcome::Analyzed(page) => page,
                PageOutcome::Skipped => {
                    job.mark_dropped(&url);
                    if self.wait_before_next(&job).await {
                        stopped = true;
                        break;
                    }
                    continue;
                }
                PageOutcome::Cancelled => {
                    tracing::info!("Stopping crawl as requested, abandoning {}", url);
                    stopped = true;
                    break;
                }
            };

            if job.is_question_mode() {
                if let Some(answer) = page.answer.clone() {
                    tracing::info!("Found answer on page: {}", page.url);
                    job.mark_visited(&page.url);
                    pages_processed += 1;
                    self.status.record_processed();
                    job.record_answer(FoundAnswer {
                        url: page.url.to_string(),
                        title: page.title.clone(),
                        answer,
                    });
                    break;
                }
            }

            self.persist_best_effort(&page).await;

            job.mark_visited(&page.url);
            pages_processed += 1;
            self.status.record_processed();

            if self.stop.is_requested() {
                tracing::info!("Stopping crawl as requested");
                stopped = true;
                break;
            }

            let added = job.enqueue_links(&page.outbound_links);
            tracing::debug!(
                "Queued {} new links from {} ({} in frontier)",
                added,
                page.url,
                job.frontier_len()
            );

            if self.wait_before_next(&job).await {
                stopped = true;
                break;
            }
        }

        self.status.finish(stopped);
        drop(lease);

        tracing::info!(
            "Crawl {}: {} pages processed in {:?}",
            if stopped { "stopped" } else { "completed" },
            pages_processed,
            start_time.elapsed()
        );

        job.into_outcome(pages_processed, stopped)
    }

    /// Fetch, extract and analyze one page
    async fn process_url(&self, job: &CrawlJob, url: &Url) -> PageOutcome {
        let body = match fetch_url(&self.client, url.as_str()).await {
            FetchResult::Success {
                status_code, body, ..
            } => {
                tracing::debug!("Fetched {} (HTTP {})", url, status_code);
                body
            }
            failure => {
                tracing::warn!(
                    "Skipping {}: {}",
                    url,
                    failure.failure_reason().unwrap_or_default()
                );
                return PageOutcome::Skipped;
            }
        };

        let extracted = extract_page(&body, url, job.base_origin());

        if self.stop.is_requested() {
            return PageOutcome::Cancelled;
        }

        let input = truncate_for_analysis(&extracted.body_text, self.max_input_chars);
        let analysis = self.analyzer.analyze(input, job.question()).await;
        let answer = if analysis.has_answer() {
            analysis.answer
        } else {
            None
        };

        PageOutcome::Analyzed(PageResult {
            url: url.clone(),
            title: extracted.title,
            body_text: extracted.body_text,
            outbound_links: extracted.links,
            summary: analysis.summary,
            keywords: analysis.keywords,
            answer,
        })
    }

    /// Persists a page, logging and swallowing any store failure
    async fn persist_best_effort(&self, page: &PageResult) {
        let Some(store) = &self.store else {
            return;
        };

        if let Err(e) = store
            .persist_page(page.url.as_str(), &page.title, &page.summary, &page.keywords)
            .await
        {
            tracing::warn!(
                "Failed to store {}, continuing without storage: {}",
                page.url,
                e
            );
        }
    }

    /// Applies the inter-request delay when another page will follow
    ///
    /// Returns true if a stop was requested before or during the wait.
    async fn wait_before_next(&self, job: &CrawlJob) -> bool {
        if job.frontier_is_empty() || job.budget_exhausted() {
            return self.stop.is_requested();
        }
        self.stop.sleep_unless_stopped(self.request_delay).await
    }
}
