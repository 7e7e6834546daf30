use url::Url;

/// Extracts the domain from a URL
///
/// Returns the lowercase host portion of the URL, without the port. If the URL has no
/// host (which shouldn't happen for valid HTTP(S) URLs), it returns None.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use sitewise::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Returns the registered domain of a URL: its last two host labels
///
/// This is a simple approximation that ignores public suffixes like `co.uk`; it
/// is used for grouping and log output, never for access decisions.
pub fn registered_domain(url: &Url) -> Option<String> {
    let host = extract_domain(url)?;
    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() >= 2 {
        Some(labels[labels.len() - 2..].join("."))
    } else {
        Some(host)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_simple_domain() {
        let url = Url::parse("https://example.com/").unwrap();
        assert_eq!(extract_domain(&url), Some("example.com".to_string()));
    }

    #[test]
    fn test_extract_with_port() {
        let url = Url::parse("https://example.com:8080/").unwrap();
        assert_eq!(extract_domain(&url), Some("example.com".to_string()));
    }

    #[test]
    fn test_extract_mixed_case() {
        let url = Url::parse("https://Example.COM/").unwrap();
        assert_eq!(extract_domain(&url), Some("example.com".to_string()));
    }

    #[test]
    fn test_registered_domain() {
        let url = Url::parse("https://api.v2.example.com/endpoint").unwrap();
        assert_eq!(registered_domain(&url), Some("example.com".to_string()));

        let url = Url::parse("http://localhost:3000/").unwrap();
        assert_eq!(registered_domain(&url), Some("localhost".to_string()));
    }
}
