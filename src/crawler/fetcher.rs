//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the HTTP client with browser-like headers
//! - Bounded redirects and a whole-request timeout
//! - Tolerant status handling (anything below 500 is inspected)
//! - Error classification into a `FetchResult`

use crate::config::FetcherConfig;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE};
use reqwest::{redirect::Policy, Client};
use std::time::Duration;

/// Content types whose bodies are treated as page text
const TEXTUAL_CONTENT_TYPES: &[&str] = &["text/", "application/xhtml+xml", "application/xml"];

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchResult {
    /// The server returned a textual body (status below 500)
    Success {
        /// HTTP status code
        status_code: u16,
        /// Page body content
        body: String,
    },

    /// The server answered with a 5xx status
    ServerError {
        /// The HTTP status code
        status_code: u16,
    },

    /// The body is not text (image, PDF, JSON, ...)
    ContentMismatch {
        /// The actual Content-Type received
        content_type: String,
    },

    /// The response carried no body at all
    EmptyBody {
        /// The HTTP status code
        status_code: u16,
    },

    /// Transport error (timeout, DNS failure, connection reset, too many redirects)
    NetworkError {
        /// Error description
        error: String,
    },
}

impl FetchResult {
    /// Short description of a failed fetch, for logging
    pub fn failure_reason(&self) -> Option<String> {
        match self {
            Self::Success { .. } => None,
            Self::ServerError { status_code } => Some(format!("HTTP {}", status_code)),
            Self::ContentMismatch { content_type } => {
                Some(format!("Expected text, got {}", content_type))
            }
            Self::EmptyBody { status_code } => Some(format!("Empty body (HTTP {})", status_code)),
            Self::NetworkError { error } => Some(error.clone()),
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The fetcher configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use sumi_inquiry::config::FetcherConfig;
/// use sumi_inquiry::crawler::build_http_client;
///
/// let client = build_http_client(&FetcherConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &FetcherConfig) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    if let Ok(accept) = HeaderValue::from_str(&config.accept) {
        headers.insert(ACCEPT, accept);
    }
    if let Ok(language) = HeaderValue::from_str(&config.accept_language) {
        headers.insert(ACCEPT_LANGUAGE, language);
    }

    Client::builder()
        .user_agent(config.user_agent.clone())
        .default_headers(headers)
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.timeout_secs))
        .redirect(Policy::limited(config.max_redirects))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a URL and classifies the outcome
///
/// # Outcomes
///
/// | Condition | Result |
/// |-----------|--------|
/// | Status < 500 with a textual body | Success (404/403 bodies included) |
/// | Status >= 500 | ServerError |
/// | Non-textual Content-Type | ContentMismatch |
/// | Missing or empty body | EmptyBody |
/// | Timeout / DNS / connection / redirect limit | NetworkError |
///
/// A response without a Content-Type header is accepted when its body is text.
pub async fn fetch_url(client: &Client, url: &str) -> FetchResult {
    let response = match client.get(url).send().await {
        Ok(response) => response,
        Err(e) => return classify_transport_error(&e),
    };

    let status = response.status();

    if status.is_server_error() {
        return FetchResult::ServerError {
            status_code: status.as_u16(),
        };
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    if !content_type.is_empty() && !is_textual(&content_type) {
        return FetchResult::ContentMismatch { content_type };
    }

    match response.text().await {
        Ok(body) if body.trim().is_empty() => FetchResult::EmptyBody {
            status_code: status.as_u16(),
        },
        Ok(body) => FetchResult::Success {
            status_code: status.as_u16(),
            body,
        },
        Err(e) => classify_transport_error(&e),
    }
}

fn is_textual(content_type: &str) -> bool {
    let lowered = content_type.to_ascii_lowercase();
    lowered.contains("html")
        || TEXTUAL_CONTENT_TYPES
            .iter()
            .any(|prefix| lowered.starts_with(prefix))
}

fn classify_transport_error(e: &reqwest::Error) -> FetchResult {
    let error = if e.is_timeout() {
        "Request timeout".to_string()
    } else if e.is_connect() {
        "Connection failed".to_string()
    } else if e.is_redirect() {
        "Too many redirects".to_string()
    } else {
        e.to_string()
    };
    FetchResult::NetworkError { error }
}
