//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CrawlJob`: visited set, frontier and answer of one crawl, owned by the engine loop
//! - `StatusReporter` / `CrawlStatus`: progress snapshot readable from any task
//! - `StopHandle`: cooperative cancellation flag

mod crawl_job;
mod status;
mod stop;

// Re-export main types
pub use crawl_job::{CrawlJob, CrawlOutcome, FoundAnswer, PageResult};
pub use status::{CrawlStatus, EngineState, StatusReporter};
pub use stop::StopHandle;
