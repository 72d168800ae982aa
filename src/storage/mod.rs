//! Storage module for persisting analyzed pages
//!
//! This module handles the optional page store, including:
//! - The `PageStore` collaborator trait the crawl engine calls
//! - A SQLite implementation with page and keyword tables
//! - Read queries used by the reporting commands

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqlitePageStore;
pub use traits::{PageStore, StorageError, StorageResult};

use serde::Serialize;
use std::path::Path;

/// Opens (or creates) a SQLite page store
pub fn open_store(path: &Path) -> StorageResult<SqlitePageStore> {
    SqlitePageStore::new(path)
}

/// A page as stored in the database
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredPage {
    pub url: String,
    pub title: String,
    pub summary: String,
    /// Keywords sorted by name
    pub keywords: Vec<String>,
    /// RFC 3339 timestamp of the last persist
    pub last_updated: String,
}

/// A keyword with the number of pages linked to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeywordCount {
    pub keyword: String,
    pub pages: u64,
}
