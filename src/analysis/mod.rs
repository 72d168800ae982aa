//! Page analysis boundary
//!
//! The crawler hands extracted page text to a [`PageAnalyzer`] and gets back
//! a summary, keywords, and (in question mode) an optional grounded answer.
//! Analyzers never fail: any problem degrades to an empty [`PageAnalysis`].

mod chat;
mod response;

pub use chat::{AnalyzerError, ChatAnalyzer};
pub use response::parse_analysis_response;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Default number of characters handed to an analyzer
pub const DEFAULT_MAX_INPUT_CHARS: usize = 3000;

/// Structured result of analyzing one page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageAnalysis {
    pub summary: String,
    pub keywords: Vec<String>,
    /// Direct answer to the question, only when grounded in the page text
    pub answer: Option<String>,
}

impl PageAnalysis {
    /// True when the analysis carries a usable answer
    pub fn has_answer(&self) -> bool {
        self.answer.as_deref().is_some_and(|a| !a.trim().is_empty())
    }
}

/// Text-analysis collaborator consumed by the crawl engine
#[async_trait]
pub trait PageAnalyzer: Send + Sync {
    /// Analyzes page text, optionally answering `question`
    ///
    /// Implementations must return `PageAnalysis::default()` rather than an
    /// error when the underlying service fails or answers in an unexpected
    /// shape, and must leave `answer` empty when the text does not support one.
    async fn analyze(&self, text: &str, question: Option<&str>) -> PageAnalysis;
}

/// Cuts `text` to at most `max_chars` characters on a char boundary
///
/// # Examples
///
/// ```
/// use sumi_inquiry::analysis::truncate_for_analysis;
///
/// assert_eq!(truncate_for_analysis("héllo world", 5), "héllo");
/// assert_eq!(truncate_for_analysis("short", 100), "short");
/// ```
pub fn truncate_for_analysis(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}
