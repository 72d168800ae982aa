use crate::url::normalize::strip_fragment;
use url::{Origin, Url};

/// Schemes that never point at a crawlable page
const REJECTED_SCHEMES: &[&str] = &["javascript", "mailto", "tel", "file"];

/// Resolves a candidate link and returns it if it may enter the frontier
///
/// # Rules
///
/// 1. Resolve `candidate` against `context`; unresolvable links are rejected
/// 2. `javascript:`, `mailto:`, `tel:` and `file:` links are rejected
/// 3. The resolved origin must equal `base_origin`
/// 4. The fragment is stripped; a link that then points back at `context`
///    (a same-page anchor) is rejected
///
/// Query strings are kept and treated as distinguishing.
///
/// # Arguments
///
/// * `candidate` - The raw `href` value
/// * `context` - The page the link was found on
/// * `base_origin` - Origin of the crawl's start URL
///
/// # Returns
///
/// The absolute, fragment-free URL, or `None` if the link is not eligible
pub fn eligible_link(candidate: &str, context: &Url, base_origin: &Origin) -> Option<Url> {
    let candidate = candidate.trim();

    let resolved = context.join(candidate).ok()?;

    if REJECTED_SCHEMES.contains(&resolved.scheme()) {
        return None;
    }

    if &resolved.origin() != base_origin {
        return None;
    }

    let resolved = strip_fragment(&resolved);
    if resolved == strip_fragment(context) {
        return None;
    }

    Some(resolved)
}

/// Decides whether a candidate link may enter the frontier
///
/// Never panics or errors: anything that cannot be resolved is simply not
/// eligible. See [`eligible_link`] for the rules.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use sumi_inquiry::url::is_eligible;
///
/// let page = Url::parse("https://example.com/docs/").unwrap();
/// let origin = page.origin();
///
/// assert!(is_eligible("intro", &page, &origin));
/// assert!(!is_eligible("https://other.com/", &page, &origin));
/// assert!(!is_eligible("#section", &page, &origin));
/// assert!(!is_eligible("mailto:team@example.com", &page, &origin));
/// ```
pub fn is_eligible(candidate: &str, context: &Url, base_origin: &Origin) -> bool {
    eligible_link(candidate, context, base_origin).is_some()
}
