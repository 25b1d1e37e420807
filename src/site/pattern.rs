use std::fmt;
use std::str::FromStr;

use url::Url;

use super::normalize::parse_page_url;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PatternError {
    #[error("Site pattern is empty")]
    Empty,
    #[error("Site pattern {0:?} is not of the form scheme://host/path")]
    Unparseable(String),
    #[error("Site pattern {0:?} has no host")]
    EmptyHost(String),
    #[error(
        "Site pattern {0:?} has a misplaced wildcard: only a leading '*.' host label or a trailing '/*' path segment is allowed"
    )]
    MisplacedWildcard(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum HostRule {
    Exact(String),
    /// `*.example.com`: the bare domain or any subdomain of it.
    Subdomains(String),
}

impl HostRule {
    fn matches(&self, host: &str) -> bool {
        match self {
            HostRule::Exact(expected) => host == expected,
            HostRule::Subdomains(domain) => {
                host == domain
                    || host
                        .strip_suffix(domain.as_str())
                        .is_some_and(|label| label.len() > 1 && label.ends_with('.'))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PathRule {
    Exact(String),
    /// Pattern path ending in `/*`; holds everything before the `*`.
    Prefix(String),
}

impl PathRule {
    fn matches(&self, path: &str) -> bool {
        match self {
            PathRule::Exact(expected) => path == expected,
            PathRule::Prefix(prefix) => path.starts_with(prefix.as_str()),
        }
    }
}

/// A stored URL template authorizing credential use on matching pages.
///
/// Wildcards are opt-in: `https://*.example.com/*` covers the domain and all
/// of its subdomains under any path, `https://example.com/*` covers only that
/// exact host, and a pattern without a trailing `/*` requires the exact path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitePattern {
    raw: String,
    scheme: String,
    host: HostRule,
    /// Explicit port, or the scheme's default.
    port: Option<u16>,
    path: PathRule,
}

impl SitePattern {
    pub fn parse(pattern: &str) -> Result<Self, PatternError> {
        let raw = pattern.trim();
        if raw.is_empty() {
            return Err(PatternError::Empty);
        }
        let unparseable = || PatternError::Unparseable(raw.to_string());
        let misplaced = || PatternError::MisplacedWildcard(raw.to_string());

        let (scheme, rest) = raw.split_once("://").ok_or_else(unparseable)?;
        if scheme.contains('*') {
            return Err(misplaced());
        }

        // The wildcard label is stripped from the authority text before the
        // remainder goes through the URL parser.
        let authority_end = rest.find(['/', '\\', '?', '#']).unwrap_or(rest.len());
        let (authority, tail) = rest.split_at(authority_end);
        let (subdomains, authority) = match authority.strip_prefix("*.") {
            Some(domain) => (true, domain),
            None => (false, authority),
        };
        if authority.is_empty() {
            return Err(PatternError::EmptyHost(raw.to_string()));
        }
        if authority.contains('*') {
            return Err(misplaced());
        }

        let url = Url::parse(&format!("{scheme}://{authority}{tail}")).map_err(|_| unparseable())?;
        let host = match url.host_str() {
            Some(host) if !host.is_empty() => host.to_ascii_lowercase(),
            _ => return Err(PatternError::EmptyHost(raw.to_string())),
        };
        let host = if subdomains {
            // `*.` only makes sense in front of a domain name, not an IP.
            if url.domain().is_none() {
                return Err(misplaced());
            }
            HostRule::Subdomains(host)
        } else {
            HostRule::Exact(host)
        };

        let path = url.path();
        let path = match path.strip_suffix('*') {
            Some(prefix) if prefix.ends_with('/') && !prefix.contains('*') => {
                PathRule::Prefix(prefix.to_string())
            }
            Some(_) => return Err(misplaced()),
            None if path.contains('*') => return Err(misplaced()),
            None => PathRule::Exact(path.to_string()),
        };

        Ok(Self {
            raw: raw.to_string(),
            scheme: url.scheme().to_string(),
            host,
            port: url.port_or_known_default(),
            path,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether this pattern authorizes the given page URL.
    ///
    /// The page URL is parsed the way a browser parses it; query, fragment
    /// and userinfo are ignored. A page URL without a host never matches.
    pub fn matches(&self, page_url: &str) -> bool {
        let Some(page) = parse_page_url(page_url) else {
            return false;
        };
        let Some(host) = page.host_str() else {
            return false;
        };

        page.scheme() == self.scheme
            && self.host.matches(&host.to_ascii_lowercase())
            && page.port_or_known_default() == self.port
            && self.path.matches(page.path())
    }
}

impl FromStr for SitePattern {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for SitePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
