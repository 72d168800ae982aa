//! Cooperative cancellation for a running crawl

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Shared stop flag for a crawl engine
///
/// The engine samples the flag before each fetch, before each analyzer call
/// and while waiting out the inter-request delay. An in-flight fetch or
/// analysis is never interrupted.
#[derive(Debug, Clone)]
pub struct StopHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for StopHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl StopHandle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Requests that the running crawl stop; idempotent
    pub fn request_stop(&self) {
        self.tx.send_replace(true);
    }

    /// Returns true once a stop has been requested for the current job
    pub fn is_requested(&self) -> bool {
        *self.tx.borrow()
    }

    /// Clears the flag at the start of a fresh job
    pub(crate) fn reset(&self) {
        self.tx.send_replace(false);
    }

    /// Sleeps for `delay`, waking early if a stop is requested
    ///
    /// Returns true if a stop was requested before or during the wait.
    pub async fn sleep_unless_stopped(&self, delay: Duration) -> bool {
        if self.is_requested() {
            return true;
        }

        let mut rx = self.tx.subscribe();
        tokio::select! {
            _ = tokio::time::sleep(delay) => self.is_requested(),
            stopped = async move { rx.wait_for(|stop| *stop).await.is_ok() } => stopped,
        }
    }
}
