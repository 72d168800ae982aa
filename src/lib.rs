//! Sumi-Inquiry: a question-answering site crawler
//!
//! This crate walks a single origin breadth-first, extracts readable text and
//! links from every page, asks a text-analysis collaborator to summarize each
//! page, and stops the moment a page answers the caller's question.

pub mod analysis;
pub mod config;
pub mod crawler;
pub mod output;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Sumi-Inquiry operations
#[derive(Debug, Error)]
pub enum InquiryError {
    #[error("Invalid start URL: {0}")]
    InvalidStartUrl(#[from] UrlError),

    #[error("A crawl is already running on this engine")]
    CrawlInProgress,

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Result type alias for Sumi-Inquiry operations
pub type Result<T> = std::result::Result<T, InquiryError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use analysis::{PageAnalysis, PageAnalyzer};
pub use config::Config;
pub use crawler::CrawlEngine;
pub use state::{CrawlOutcome, CrawlStatus, EngineState, FoundAnswer, StopHandle};
pub use storage::PageStore;
pub use url::{is_eligible, parse_start_url};
