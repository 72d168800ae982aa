//! HTML content extraction
//!
//! This module turns raw HTML into what the rest of the pipeline needs:
//! - A page title
//! - Readable body text with scripts, styles and embedded media left out
//! - Eligible same-origin links to follow

use crate::url::eligible_link;
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use url::{Origin, Url};

/// Elements whose content never reaches the body text
const SKIPPED_ELEMENTS: &[&str] = &[
    "script", "style", "noscript", "iframe", "img", "svg", "video", "audio", "object", "embed",
    "canvas", "template",
];

/// Elements that separate words in rendered text
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt", "figcaption",
    "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main",
    "nav", "ol", "p", "pre", "section", "table", "td", "th", "tr", "ul",
];

/// Content extracted from an HTML page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedPage {
    /// `<title>`, else the first `<h1>`, else the page URL
    pub title: String,

    /// Document text with whitespace runs collapsed to single spaces
    pub body_text: String,

    /// Eligible links in document order, deduplicated, fragments stripped
    pub links: Vec<Url>,
}

/// Extracts title, body text and outbound links from an HTML document
///
/// # Arguments
///
/// * `html` - The raw HTML
/// * `page_url` - URL the HTML was fetched from, used to resolve relative links
/// * `base_origin` - Origin of the crawl; links elsewhere are dropped
///
/// # Example
///
/// ```
/// use sumi_inquiry::crawler::extract_page;
/// use url::Url;
///
/// let url = Url::parse("https://example.com/").unwrap();
/// let html = r#"<html><head><title>Home</title></head>
///     <body><p>Hello   world</p><a href="/about">About</a></body></html>"#;
/// let page = extract_page(html, &url, &url.origin());
/// assert_eq!(page.title, "Home");
/// assert_eq!(page.body_text, "Hello world About");
/// assert_eq!(page.links[0].as_str(), "https://example.com/about");
/// ```
pub fn extract_page(html: &str, page_url: &Url, base_origin: &Origin) -> ExtractedPage {
    let document = Html::parse_document(html);

    let title = extract_title(&document).unwrap_or_else(|| page_url.to_string());
    let body_text = extract_body_text(&document);
    let links = extract_links(&document, page_url, base_origin);

    ExtractedPage {
        title,
        body_text,
        links,
    }
}

/// First non-empty `<title>`, falling back to the first non-empty `<h1>`
fn extract_title(document: &Html) -> Option<String> {
    first_text(document, "title").or_else(|| first_text(document, "h1"))
}

fn first_text(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .next()
        .map(|element| collapse_whitespace(&element.text().collect::<String>()))
        .filter(|s| !s.is_empty())
}

fn extract_body_text(document: &Html) -> String {
    let root = Selector::parse("body")
        .ok()
        .and_then(|selector| document.select(&selector).next())
        .unwrap_or_else(|| document.root_element());

    collapse_whitespace(&collect_text(root))
}

/// Concatenates text under `root`, skipping non-content elements
///
/// Walks with an explicit stack so arbitrarily deep markup cannot exhaust the
/// thread stack. Block-level elements are padded with spaces; inline markup
/// such as `H<sub>2</sub>O` is joined without one.
fn collect_text(root: ElementRef<'_>) -> String {
    let mut out = String::new();
    // `None` marks the end of a block element
    let mut stack = vec![Some(*root)];

    while let Some(step) = stack.pop() {
        let Some(node) = step else {
            out.push(' ');
            continue;
        };

        match node.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(element) => {
                let name = element.name();
                if SKIPPED_ELEMENTS.contains(&name) {
                    continue;
                }
                if BLOCK_ELEMENTS.contains(&name) {
                    out.push(' ');
                    stack.push(None);
                }
                stack.extend(node.children().rev().map(Some));
            }
            _ => {}
        }
    }

    out
}

fn extract_links(document: &Html, page_url: &Url, base_origin: &Origin) -> Vec<Url> {
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for element in document.select(&selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        if let Some(link) = eligible_link(href, page_url, base_origin) {
            if seen.insert(link.as_str().to_string()) {
                links.push(link);
            }
        }
    }

    links
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
