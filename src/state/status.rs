//! Crawl progress shared between the engine loop and outside readers
//!
//! The engine is the only writer; status readers take a cloned snapshot and
//! never block the loop for longer than a field copy.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Snapshot of crawl progress, serialized with camelCase keys
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlStatus {
    /// Pages that completed the whole fetch, extract, analyze pipeline
    pub pages_processed: usize,

    /// Page budget of the job, fixed at job start
    pub total_pages: usize,

    /// Page currently being processed, or the last one processed
    pub current_url: Option<String>,

    /// Set once the job loop exits for any reason
    pub completed: bool,

    /// Set only when the loop exited because a stop was requested
    pub stopped: bool,
}

/// Lifecycle of the engine's current (or last) job
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineState {
    #[default]
    Idle,
    Running,
    Completed,
    Stopped,
}

#[derive(Debug, Default)]
struct Tracker {
    status: CrawlStatus,
    state: EngineState,
}

/// Read side of the crawl status, cheap to clone and share across tasks
#[derive(Debug, Clone, Default)]
pub struct StatusReporter {
    inner: Arc<RwLock<Tracker>>,
}

impl StatusReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the current status
    ///
    /// Safe to call at any time, including mid-crawl; has no side effects.
    pub fn snapshot(&self) -> CrawlStatus {
        self.read().status.clone()
    }

    /// Returns the lifecycle state of the current (or last) job
    pub fn state(&self) -> EngineState {
        self.read().state
    }

    /// Resets the status for a fresh job and marks it running
    pub(crate) fn begin(&self, total_pages: usize, start_url: &str) {
        let mut tracker = self.write();
        tracker.status = CrawlStatus {
            pages_processed: 0,
            total_pages,
            current_url: Some(start_url.to_string()),
            completed: false,
            stopped: false,
        };
        tracker.state = EngineState::Running;
    }

    pub(crate) fn set_current_url(&self, url: &str) {
        let mut tracker = self.write();
        if tracker.state == EngineState::Running {
            tracker.status.current_url = Some(url.to_string());
        }
    }

    pub(crate) fn record_processed(&self) {
        let mut tracker = self.write();
        if tracker.state == EngineState::Running
            && tracker.status.pages_processed < tracker.status.total_pages
        {
            tracker.status.pages_processed += 1;
        }
    }

    /// Moves a running job to its terminal state
    ///
    /// Later calls are ignored: a finished status is never mutated again.
    pub(crate) fn finish(&self, stopped: bool) {
        let mut tracker = self.write();
        if tracker.state != EngineState::Running {
            return;
        }
        tracker.status.completed = true;
        tracker.status.stopped = stopped;
        tracker.state = if stopped {
            EngineState::Stopped
        } else {
            EngineState::Completed
        };
    }

    fn read(&self) -> RwLockReadGuard<'_, Tracker> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tracker> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}
