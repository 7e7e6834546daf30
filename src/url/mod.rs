//! URL handling module for Sitewise
//!
//! This module provides URL normalization, host extraction and allowed-domain
//! matching. Every URL the crawl engine considers goes through [`normalize_url`]
//! before the visited set or the domain filter sees it.

mod domain;
mod matcher;
mod normalize;

// Re-export main functions
pub use domain::{extract_domain, registered_domain};
pub use matcher::{is_allowed_host, matches_domain};
pub use normalize::normalize_url;

use url::Url;

/// Checks whether a (normalized) URL's host is covered by the allowed domains
pub fn is_allowed_url<S: AsRef<str>>(url: &Url, allowed: &[S]) -> bool {
    match extract_domain(url) {
        Some(host) => is_allowed_host(&host, allowed),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_url() {
        let allowed = ["example.com"];
        let url = normalize_url("https://blog.example.com/post").unwrap();
        assert!(is_allowed_url(&url, &allowed));
    }

    #[test]
    fn test_disallowed_url() {
        let allowed = ["example.com"];
        let url = normalize_url("https://elsewhere.org/").unwrap();
        assert!(!is_allowed_url(&url, &allowed));
    }
}
