//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with content-type and status checks
//! - HTML text and link extraction
//! - The FIFO frontier of URLs waiting to be visited
//! - The crawl engine that drives a job from start URL to outcome

mod coordinator;
mod extractor;
mod fetcher;
mod frontier;

pub use coordinator::CrawlEngine;
pub use extractor::{extract_page, ExtractedPage};
pub use fetcher::{build_http_client, fetch_url, FetchResult};
pub use frontier::Frontier;
