use url::Url;

/// Removes the fragment (`#...`) from a URL
///
/// This is the only canonicalization the crawler applies: query strings,
/// trailing slashes, and host casing beyond what the `url` crate already
/// normalizes are all treated as distinguishing.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use sumi_inquiry::url::strip_fragment;
///
/// let url = Url::parse("https://example.com/page?a=1#section").unwrap();
/// assert_eq!(strip_fragment(&url).as_str(), "https://example.com/page?a=1");
/// ```
pub fn strip_fragment(url: &Url) -> Url {
    let mut stripped = url.clone();
    stripped.set_fragment(None);
    stripped
}

/// Returns the visited-set key for a URL (absolute, fragment stripped)
pub fn visit_key(url: &Url) -> String {
    strip_fragment(url).into()
}
