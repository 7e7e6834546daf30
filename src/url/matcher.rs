/// Checks if a host falls under an allowed-domain pattern
///
/// A pattern matches the domain itself and every subdomain of it. A leading
/// `*.` is accepted and means the same thing, so both `example.com` and
/// `*.example.com` match:
///    - "example.com" (the bare domain)
///    - "blog.example.com" (single subdomain)
///    - "api.v2.example.com" (nested subdomains)
///
/// Both arguments are expected to be lowercase.
///
/// # Examples
///
/// ```
/// use sitewise::url::matches_domain;
///
/// assert!(matches_domain("example.com", "example.com"));
/// assert!(matches_domain("example.com", "blog.example.com"));
/// assert!(matches_domain("*.example.com", "api.v2.example.com"));
/// assert!(!matches_domain("example.com", "example.org"));
/// assert!(!matches_domain("example.com", "myexample.com"));
/// ```
pub fn matches_domain(pattern: &str, candidate: &str) -> bool {
    let base = pattern.strip_prefix("*.").unwrap_or(pattern);
    if base.is_empty() || candidate.is_empty() {
        return false;
    }

    candidate == base
        || candidate
            .strip_suffix(base)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

/// Checks if a host is allowed by any of the given domain patterns
pub fn is_allowed_host<S: AsRef<str>>(host: &str, allowed: &[S]) -> bool {
    allowed
        .iter()
        .any(|pattern| matches_domain(pattern.as_ref(), host))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match() {
        assert!(matches_domain("example.com", "example.com"));
        assert!(matches_domain("blog.example.com", "blog.example.com"));
    }

    #[test]
    fn test_subdomains_match() {
        assert!(matches_domain("example.com", "blog.example.com"));
        assert!(matches_domain("example.com", "deep.nested.sub.example.com"));
    }

    #[test]
    fn test_parent_does_not_match_child_pattern() {
        assert!(!matches_domain("blog.example.com", "example.com"));
    }

    #[test]
    fn test_wildcard_prefix_is_accepted() {
        assert!(matches_domain("*.example.com", "example.com"));
        assert!(matches_domain("*.example.com", "www.example.com"));
    }

    #[test]
    fn test_no_match_partial() {
        assert!(!matches_domain("example.com", "myexample.com"));
        assert!(!matches_domain("example.com", "example.com.org"));
        assert!(!matches_domain("*.example.com", "example.org"));
    }

    #[test]
    fn test_empty_strings() {
        assert!(!matches_domain("example.com", ""));
        assert!(!matches_domain("", "example.com"));
        assert!(!matches_domain("*.", "example.com"));
    }

    #[test]
    fn test_ip_hosts() {
        assert!(matches_domain("127.0.0.1", "127.0.0.1"));
        assert!(!matches_domain("127.0.0.1", "127.0.0.2"));
    }

    #[test]
    fn test_is_allowed_host() {
        let allowed = vec!["docs.example.org".to_string(), "cdn.example.net".to_string()];

        assert!(is_allowed_host("docs.example.org", &allowed));
        assert!(is_allowed_host("img.cdn.example.net", &allowed));
        assert!(!is_allowed_host("example.org", &allowed));
        assert!(!is_allowed_host("docs.example.org", &Vec::<String>::new()));
    }
}
