use crate::UrlError;
use url::Url;

/// Normalizes a URL according to Sitewise's normalization rules
///
/// # Normalization Steps
///
/// 1. Reject empty input
/// 2. Default the scheme to `http://` when none is given
/// 3. Parse the URL; reject if malformed or not HTTP(S)
/// 4. Lowercase the host
/// 5. Promote `http` on explicit port 443 to `https`
/// 6. Collapse trailing slashes (empty path becomes `/`)
/// 7. Remove query string and fragment
///
/// Normalizing an already-normalized URL returns it unchanged.
///
/// # Examples
///
/// ```
/// use sitewise::url::normalize_url;
///
/// let url = normalize_url("Docs.Example.ORG/guide/?page=2#intro").unwrap();
/// assert_eq!(url.as_str(), "http://docs.example.org/guide");
/// ```
pub fn normalize_url(input: &str) -> Result<Url, UrlError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(UrlError::Malformed("empty URL".to_string()));
    }

    let with_scheme = if input.contains("://") {
        input.to_string()
    } else {
        format!("http://{}", input)
    };

    let mut url = Url::parse(&with_scheme).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    let host = url.host_str().ok_or(UrlError::MissingDomain)?.to_lowercase();
    if host.is_empty() {
        return Err(UrlError::MissingDomain);
    }
    if url.host_str() != Some(host.as_str()) {
        url.set_host(Some(&host))
            .map_err(|e| UrlError::Malformed(format!("Failed to set host: {}", e)))?;
    }

    if url.scheme() == "http" && url.port() == Some(443) {
        url.set_scheme("https")
            .map_err(|_| UrlError::Malformed("Failed to promote scheme".to_string()))?;
        url.set_port(None)
            .map_err(|_| UrlError::Malformed("Failed to clear port".to_string()))?;
    }

    let path = collapse_trailing_slashes(url.path());
    url.set_path(&path);

    url.set_query(None);
    url.set_fragment(None);

    Ok(url)
}

fn collapse_trailing_slashes(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}
