//! Per-job crawl state and the records a job produces

use crate::crawler::Frontier;
use crate::url::{base_origin, visit_key};
use serde::Serialize;
use std::collections::HashSet;
use url::{Origin, Url};

/// The page that answered the job's question
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FoundAnswer {
    pub url: String,
    pub title: String,
    pub answer: String,
}

/// Everything the pipeline learned about one fetched page
#[derive(Debug, Clone)]
pub struct PageResult {
    pub url: Url,
    pub title: String,
    pub body_text: String,
    /// Eligible same-origin links, deduplicated, in document order
    pub outbound_links: Vec<Url>,
    pub summary: String,
    pub keywords: Vec<String>,
    pub answer: Option<String>,
}

/// Final result of a crawl job
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlOutcome {
    pub found_answer: Option<FoundAnswer>,
    pub pages_processed: usize,
    pub stopped: bool,
    /// Visited URLs in visit order
    pub visited: Vec<String>,
}

/// State of one crawl job, owned exclusively by the engine loop
#[derive(Debug)]
pub struct CrawlJob {
    start_url: Url,
    base_origin: Origin,
    visited: HashSet<String>,
    visit_order: Vec<String>,
    dropped: HashSet<String>,
    frontier: Frontier,
    max_pages: usize,
    question: Option<String>,
    found_answer: Option<FoundAnswer>,
}

impl CrawlJob {
    /// Creates a job seeded with its start URL
    ///
    /// A blank question is treated as no question.
    pub fn new(start_url: Url, question: Option<&str>, max_pages: usize) -> Self {
        let mut frontier = Frontier::new();
        frontier.push(start_url.clone());

        Self {
            base_origin: base_origin(&start_url),
            start_url,
            visited: HashSet::new(),
            visit_order: Vec::new(),
            dropped: HashSet::new(),
            frontier,
            max_pages,
            question: question
                .map(str::trim)
                .filter(|q| !q.is_empty())
                .map(str::to_string),
            found_answer: None,
        }
    }

    pub fn start_url(&self) -> &Url {
        &self.start_url
    }

    pub fn base_origin(&self) -> &Origin {
        &self.base_origin
    }

    pub fn question(&self) -> Option<&str> {
        self.question.as_deref()
    }

    /// True when the job runs in early-exit mode
    pub fn is_question_mode(&self) -> bool {
        self.question.is_some()
    }

    pub fn max_pages(&self) -> usize {
        self.max_pages
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    pub fn budget_exhausted(&self) -> bool {
        self.visited.len() >= self.max_pages
    }

    pub fn frontier_len(&self) -> usize {
        self.frontier.len()
    }

    pub fn frontier_is_empty(&self) -> bool {
        self.frontier.is_empty()
    }

    /// Dequeues the next URL in FIFO order
    pub fn next_url(&mut self) -> Option<Url> {
        self.frontier.pop()
    }

    /// True for URLs that were visited or whose fetch failed in this job
    pub fn is_settled(&self, url: &Url) -> bool {
        let key = visit_key(url);
        self.visited.contains(&key) || self.dropped.contains(&key)
    }

    /// Records a completed visit; returns false if the URL was already visited
    pub fn mark_visited(&mut self, url: &Url) -> bool {
        let key = visit_key(url);
        if !self.visited.insert(key.clone()) {
            return false;
        }
        self.visit_order.push(key);
        true
    }

    /// Records a URL whose fetch failed so it is never queued again
    pub fn mark_dropped(&mut self, url: &Url) {
        self.dropped.insert(visit_key(url));
    }

    /// Queues every link that is not visited, dropped, or already queued
    ///
    /// Returns how many links were added.
    pub fn enqueue_links(&mut self, links: &[Url]) -> usize {
        let mut added = 0;
        for link in links {
            if self.is_settled(link) {
                continue;
            }
            if self.frontier.push(link.clone()) {
                added += 1;
            }
        }
        added
    }

    /// Stores the answer; the first answer wins
    pub fn record_answer(&mut self, answer: FoundAnswer) {
        if self.found_answer.is_none() {
            self.found_answer = Some(answer);
        }
    }

    /// Consumes the job into its outcome
    pub fn into_outcome(self, pages_processed: usize, stopped: bool) -> CrawlOutcome {
        CrawlOutcome {
            found_answer: self.found_answer,
            pages_processed,
            stopped,
            visited: self.visit_order,
        }
    }
}
