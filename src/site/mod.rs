//! URL normalization and site pattern matching.
//!
//! This is the authorization gate for filling credentials: a stored entry is
//! only offered on pages its pattern matches. Matching is conservative by
//! default. Subdomains and path prefixes only match when the pattern opts in
//! with a wildcard, and anything that fails to parse never matches.

mod normalize;
mod pattern;

pub use pattern::{PatternError, SitePattern};
pub use normalize::{normalize_url, parse_page_url, slash_needed_for_url, trim_url};

use tracing::{debug, warn};

use crate::backend::SiteEntry;

/// Whether the stored `pattern` authorizes `page_url`.
///
/// Malformed patterns are treated as non-matching.
pub fn site_match(pattern: &str, page_url: &str) -> bool {
    match SitePattern::parse(pattern) {
        Ok(pattern) => pattern.matches(page_url),
        Err(err) => {
            debug!(error = %err, "site pattern rejected");
            false
        }
    }
}

/// Filter stored entries down to the ones whose pattern matches `page_url`.
///
/// Each entry is evaluated on its own; a malformed pattern is skipped with a
/// warning and does not affect the remaining entries.
pub fn matching_entries<'a>(entries: &'a [SiteEntry], page_url: &str) -> Vec<&'a SiteEntry> {
    entries
        .iter()
        .filter(|entry| match SitePattern::parse(&entry.url) {
            Ok(pattern) => pattern.matches(page_url),
            Err(err) => {
                warn!(entry = %entry.name, error = %err, "skipping stored entry with malformed site pattern");
                false
            }
        })
        .collect()
}
