//! Storage traits and error types
//!
//! This module defines the trait interface for page store backends and
//! associated error types.

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Storage task failed: {0}")]
    Task(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Persistence collaborator for analyzed pages
///
/// The crawl engine calls `persist_page` once for every analyzed page that
/// did not end the job. Errors are logged by the engine and otherwise
/// ignored, so implementations may fail freely.
#[async_trait]
pub trait PageStore: Send + Sync {
    /// Stores (or refreshes) a page and links it to its keywords
    ///
    /// # Arguments
    ///
    /// * `url` - The page URL, unique per page
    /// * `title` - The extracted page title
    /// * `summary` - The analyzer's summary
    /// * `keywords` - The analyzer's keywords
    async fn persist_page(
        &self,
        url: &str,
        title: &str,
        summary: &str,
        keywords: &[String],
    ) -> StorageResult<()>;
}
