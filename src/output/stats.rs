//! Statistics generation from the page store
//!
//! This module provides functionality for extracting and displaying
//! page and keyword statistics from the SQLite store.

use crate::storage::{KeywordCount, SqlitePageStore, StorageResult};
use serde::Serialize;

/// Number of keywords listed in the statistics report
pub const TOP_KEYWORD_LIMIT: usize = 10;

/// Page store statistics summary
#[derive(Debug, Clone, Serialize)]
pub struct StoreStatistics {
    /// Total number of stored pages
    pub total_pages: u64,

    /// Number of distinct keywords
    pub total_keywords: u64,

    /// Keywords linked to the most pages, most linked first
    pub top_keywords: Vec<KeywordCount>,
}

/// Loads statistics from the page store
///
/// # Arguments
///
/// * `store` - The page store to query
///
/// # Returns
///
/// * `Ok(StoreStatistics)` - Successfully loaded statistics
/// * `Err(StorageError)` - Failed to query statistics
pub fn load_statistics(store: &SqlitePageStore) -> StorageResult<StoreStatistics> {
    Ok(StoreStatistics {
        total_pages: store.count_pages()?,
        total_keywords: store.count_keywords()?,
        top_keywords: store.top_keywords(TOP_KEYWORD_LIMIT)?,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &StoreStatistics) {
    println!("=== Page Store Statistics ===\n");

    println!("Overview:");
    println!("  Pages stored: {}", stats.total_pages);
    println!("  Distinct keywords: {}", stats.total_keywords);
    println!();

    if stats.top_keywords.is_empty() {
        println!("No keywords recorded yet.");
        return;
    }

    println!("Top Keywords:");
    for entry in &stats.top_keywords {
        let percentage = if stats.total_pages > 0 {
            (entry.pages as f64 / stats.total_pages as f64) * 100.0
        } else {
            0.0
        };
        println!(
            "  {}: {} pages ({:.1}%)",
            entry.keyword, entry.pages, percentage
        );
    }
}
