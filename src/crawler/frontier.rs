//! FIFO frontier for breadth-first traversal
//!
//! The frontier keeps discovered-but-unvisited URLs in discovery order and
//! answers "is this URL already queued?" in constant time.

use std::collections::{HashSet, VecDeque};
use url::Url;

/// Queue of URLs awaiting a visit
#[derive(Debug, Default)]
pub struct Frontier {
    queue: VecDeque<Url>,
    queued: HashSet<String>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a URL unless it is already queued
    ///
    /// Returns true if the URL was added.
    pub fn push(&mut self, url: Url) -> bool {
        if !self.queued.insert(url.as_str().to_string()) {
            return false;
        }
        self.queue.push_back(url);
        true
    }

    /// Removes and returns the oldest queued URL
    pub fn pop(&mut self) -> Option<Url> {
        let url = self.queue.pop_front()?;
        self.queued.remove(url.as_str());
        Some(url)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
