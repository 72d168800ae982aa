//! Output module for reporting on stored pages
//!
//! This module handles:
//! - Loading and printing page store statistics
//! - Generating markdown digests of stored pages

mod markdown;
pub mod stats;

pub use markdown::{format_markdown_summary, generate_markdown_summary};
pub use stats::{load_statistics, print_statistics, StoreStatistics};
