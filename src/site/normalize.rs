//! URL normalization helpers used before any pattern comparison.
//!
//! Parsing goes through [`url::Url`], the same WHATWG parser rules browsers
//! apply, so the host seen here is the host the page was actually loaded
//! from (`\` as a path separator, userinfo and default ports included).

use url::Url;

/// Strip the query string and fragment from a URL.
///
/// Query parameters (login tokens, redirect targets, tracking ids) are never
/// significant for site matching.
///
/// ```
/// use credgate::site::trim_url;
///
/// assert_eq!(
///     trim_url("https://test.com/path_to_somwhere?login=username"),
///     "https://test.com/path_to_somwhere"
/// );
/// ```
pub fn trim_url(url: &str) -> &str {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    &url[..end]
}

/// Whether a bare-origin URL (no path at all) needs a trailing slash before
/// it can be compared against a pattern.
pub fn slash_needed_for_url(url: &str) -> bool {
    let trimmed = trim_url(url.trim());
    if parse_page_url(trimmed).is_none() {
        return false;
    }
    match trimmed.split_once("://") {
        Some((_, rest)) => !rest.contains(['/', '\\']),
        None => false,
    }
}

/// Parse a page URL with a host, dropping query, fragment and userinfo.
pub fn parse_page_url(url: &str) -> Option<Url> {
    let mut parsed = Url::parse(url.trim()).ok()?;
    parsed.host_str()?;
    parsed.set_query(None);
    parsed.set_fragment(None);
    if !parsed.username().is_empty() || parsed.password().is_some() {
        // Only fails for URLs without a host, excluded above.
        let _ = parsed.set_username("");
        let _ = parsed.set_password(None);
    }
    Some(parsed)
}

/// Normalize a page URL for matching: trim query and fragment, drop
/// userinfo and default ports, lowercase the scheme and host, and add the
/// trailing slash to a bare origin.
///
/// Input that does not parse is only trimmed.
pub fn normalize_url(url: &str) -> String {
    match parse_page_url(url) {
        Some(parsed) => parsed.into(),
        None => trim_url(url.trim()).to_string(),
    }
}
