use credgate::backend::SiteEntry;
use proptest::prelude::*;
use credgate::site::{
    matching_entries, normalize_url, site_match, slash_needed_for_url, trim_url, PatternError,
    SitePattern,
};

#[test]
fn trim_url_drops_query() {
    assert_eq!(
        trim_url("https://test.com/path_to_somwhere?login=username"),
        "https://test.com/path_to_somwhere"
    );
}

#[test]
fn slash_needed_only_without_path() {
    assert!(slash_needed_for_url("https://test.com"));
    assert!(!slash_needed_for_url("https://test.com/"));
}

#[test]
fn site_preference_table() {
    // (stored pattern, page url, expected)
    let cases = [
        ("https://example.com/*", "https://example.com/login_page", true),
        ("https://example.com/*", "https://example2.com/login_page", false),
        ("https://example.com/*", "https://subdomain.example.com/login_page", false),
        ("https://*.example.com/*", "https://example.com/login_page", true),
        ("https://*.example.com/*", "https://test.example.com/login_page", true),
        ("https://test.example.com/*", "https://subdomain.example.com/login_page", false),
        ("https://test.example.com/page/*", "https://test.example.com/page/login_page", true),
        ("https://test.example.com/page/another_page/*", "https://test.example.com/page/login", false),
        ("https://test.example.com/path/another/a/", "https://test.example.com/path/another/a/", true),
        ("https://test.example.com/path/another/a/", "https://test.example.com/path/another/b/", false),
    ];

    for (pattern, url, expected) in cases {
        assert_eq!(
            site_match(pattern, url),
            expected,
            "site_match({pattern:?}, {url:?})"
        );
    }
}

#[test]
fn scheme_must_match() {
    assert!(!site_match("https://example.com/*", "http://example.com/login"));
    assert!(site_match("HTTPS://Example.COM/*", "https://example.com/login"));
}

#[test]
fn query_and_fragment_are_ignored_on_both_sides() {
    assert!(site_match(
        "https://example.com/login",
        "https://example.com/login?next=%2F#top"
    ));
    assert!(site_match(
        "https://example.com/login?ref=bookmark",
        "https://example.com/login"
    ));
}

#[test]
fn wildcard_does_not_match_lookalike_domains() {
    assert!(!site_match("https://*.example.com/*", "https://evil-example.com/"));
    assert!(!site_match("https://*.example.com/*", "https://example.com.evil.test/"));
}

#[test]
fn ports_are_part_of_the_host() {
    assert!(site_match("https://example.com:8443/*", "https://example.com:8443/a"));
    assert!(!site_match("https://example.com:8443/*", "https://example.com/a"));
}

#[test]
fn backslash_in_page_url_cannot_borrow_a_host() {
    // Browsers read `\` as `/`, so the host here is evil.test.
    for pattern in ["https://example.com/*", "https://*.example.com/*"] {
        assert!(!site_match(pattern, "https://evil.test\\.example.com/login"), "{pattern}");
        assert!(!site_match(pattern, "https://evil.test\\@example.com/login"), "{pattern}");
    }
    assert!(site_match("https://example.com/*", "https://example.com\\login"));
}

#[test]
fn userinfo_and_default_port_are_not_part_of_the_origin() {
    let cases = [
        ("https://example.com/*", "https://alice@example.com/login", true),
        ("https://example.com/*", "https://alice:pw@example.com:443/login", true),
        ("https://*.example.com/*", "https://alice@mail.example.com/", true),
        ("https://example.com/*", "https://example.com@evil.test/", false),
        ("https://*.example.com/*", "https://mail.example.com@evil.test/", false),
        ("https://example.com/*", "https://example.com:443/", true),
        ("http://example.com/*", "http://example.com:80/", true),
        ("https://example.com:443/*", "https://example.com/", true),
        ("https://example.com/*", "https://example.com:444/", false),
    ];
    for (pattern, url, expected) in cases {
        assert_eq!(site_match(pattern, url), expected, "site_match({pattern:?}, {url:?})");
    }
}

#[test]
fn malformed_patterns_are_reported_and_never_match() {
    assert_eq!(SitePattern::parse("  "), Err(PatternError::Empty));
    assert!(matches!(
        SitePattern::parse("example.com"),
        Err(PatternError::Unparseable(_))
    ));
    assert!(matches!(
        SitePattern::parse("https:///login"),
        Err(PatternError::EmptyHost(_))
    ));
    assert!(matches!(
        SitePattern::parse("https://exa*mple.com/"),
        Err(PatternError::MisplacedWildcard(_))
    ));
    assert!(matches!(
        SitePattern::parse("https://example.com/*/login"),
        Err(PatternError::MisplacedWildcard(_))
    ));

    for bad in ["", "example.com", "https:///login", "https://exa*mple.com/"] {
        assert!(!site_match(bad, "https://example.com/"), "{bad:?}");
    }
}

#[test]
fn normalize_is_stable() {
    let once = normalize_url("HTTPS://Example.com?x=1");
    assert_eq!(once, "https://example.com/");
    assert_eq!(normalize_url(&once), once);
}

#[test]
fn entries_are_filtered_independently() {
    let entries = vec![
        SiteEntry::new("work", "alice", "s1", "https://*.corp.test/*"),
        SiteEntry::new("broken", "bob", "s2", "corp.test"),
        SiteEntry::new("personal", "alice", "s3", "https://mail.test/*"),
        SiteEntry::new("sso", "alice", "s4", "https://sso.corp.test/*"),
    ];

    let names: Vec<&str> = matching_entries(&entries, "https://sso.corp.test/login")
        .into_iter()
        .map(|e| e.name.as_str())
        .collect();
    assert_eq!(names, vec!["work", "sso"]);
}

fn host_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-z][a-z0-9]{0,7}", 1..4).prop_map(|labels| labels.join("."))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    /// A wildcard covers the domain and its subdomains; an exact pattern only the domain.
    #[test]
    fn host_matches_only_on_equal_or_dot_suffix(
        domain in host_strategy(),
        host in host_strategy(),
        path in "[a-z0-9]{0,8}",
    ) {
        let url = format!("https://{host}/{path}");
        let covered = host == domain || host.ends_with(&format!(".{domain}"));
        prop_assert_eq!(site_match(&format!("https://*.{domain}/*"), &url), covered);
        prop_assert_eq!(site_match(&format!("https://{domain}/*"), &url), host == domain);
    }

    #[test]
    fn subdomains_of_a_wildcard_domain_always_match(
        domain in host_strategy(),
        sub in host_strategy(),
    ) {
        let url = format!("https://{sub}.{domain}/login");
        let wildcard_pattern = format!("https://*.{domain}/*");
        let exact_pattern = format!("https://{domain}/*");
        prop_assert!(site_match(&wildcard_pattern, &url));
        prop_assert!(!site_match(&exact_pattern, &url));
    }

    #[test]
    fn lookalike_tricks_never_reach_the_stored_domain(
        name in "[a-z][a-z0-9]{0,7}",
        evil in "[a-z][a-z0-9]{0,7}",
        user in "[a-z]{1,6}",
    ) {
        let domain = format!("{name}.com");
        let attacker = format!("{evil}.test");
        for pattern in [format!("https://{domain}/*"), format!("https://*.{domain}/*")] {
            for url in [
                format!("https://{attacker}\\.{domain}/"),
                format!("https://{attacker}\\@{domain}/"),
                format!("https://{domain}@{attacker}/"),
                format!("https://{attacker}.{domain}.evil/"),
                format!("https://{evil}{domain}/"),
            ] {
                prop_assert!(!site_match(&pattern, &url), "{} matched {}", pattern, url);
            }
            let with_user = format!("https://{user}@{domain}/");
            prop_assert!(site_match(&pattern, &with_user));
        }
    }
}
