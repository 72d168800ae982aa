use crate::UrlError;
use url::{Origin, Url};

/// Parses and checks the URL a crawl starts from
///
/// The start URL must be absolute, use `http` or `https`, and carry a host.
/// Any fragment is dropped so the start page gets the same visited-set key
/// as every later link to it.
///
/// # Examples
///
/// ```
/// use sumi_inquiry::url::parse_start_url;
///
/// let url = parse_start_url("https://example.com/docs#top").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/docs");
///
/// assert!(parse_start_url("not a url").is_err());
/// assert!(parse_start_url("ftp://example.com/").is_err());
/// ```
pub fn parse_start_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingHost);
    }

    url.set_fragment(None);
    Ok(url)
}

/// Derives the origin (scheme + host + port) that bounds a crawl
pub fn base_origin(start_url: &Url) -> Origin {
    start_url.origin()
}
