use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Parses and validates configuration from TOML text
///
/// # Example
///
/// ```
/// use sitewise::config::parse_config;
///
/// let config = parse_config("[[site]]\nurl = \"docs.example.org\"\ntype = \"sphinx\"\n").unwrap();
/// assert_eq!(config.sites.len(), 1);
/// assert_eq!(config.crawler.max_depth, 3);
/// ```
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    parse_config(&std::fs::read_to_string(path)?)
}

/// Hex SHA-256 digest of configuration text
fn digest(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

/// Computes a SHA-256 hash of the configuration file content
///
/// The hash is recorded with every run in the crawl ledger.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    Ok(digest(&std::fs::read_to_string(path)?))
}

/// Loads a configuration and returns both the config and its hash
///
/// The file is read once; the hash covers exactly the text that was parsed.
///
/// # Returns
///
/// * `Ok((Config, String))` - Successfully loaded configuration and its hash
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config = parse_config(&content)?;
    Ok((config, digest(&content)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const FULL: &str = r#"
[crawler]
max-depth = 2
max-retries = 5
retry-delay-seconds = 0.5
user-agent = "TestCrawler/0.1"
politeness-delay-seconds = 0.25
shutdown-timeout-seconds = 5
recrawl-interval-seconds = 3600

[storage]
output-dir = "./out"
save-pdf = false
database-path = "./out/test.db"

[[site]]
url = "docs.example.org"
type = "sphinx"
include-pdf = true

[[site]]
url = "https://blog.example.com"
allowed-domains = ["example.com"]
"#;

    #[test]
    fn test_parse_full_config() {
        let config = parse_config(FULL).unwrap();

        assert_eq!(config.crawler.max_depth, 2);
        assert_eq!(config.crawler.max_retries, 5);
        assert_eq!(config.crawler.user_agent, "TestCrawler/0.1");
        assert_eq!(config.crawler.recrawl_interval_seconds, Some(3600));
        assert_eq!(config.storage.output_dir, "./out");
        assert!(config.storage.save_html);
        assert!(!config.storage.save_pdf);
        assert_eq!(config.sites.len(), 2);
        assert_eq!(config.sites[0].site_type.as_deref(), Some("sphinx"));
        assert!(config.sites[0].include_pdf);
        assert_eq!(
            config.sites[1].allowed_domains,
            Some(vec!["example.com".to_string()])
        );
    }

    #[test]
    fn test_defaults_for_minimal_config() {
        let config = parse_config("[[site]]\nurl = \"example.com\"\n").unwrap();

        assert_eq!(config.crawler.request_timeout_seconds, 10);
        assert_eq!(config.crawler.user_agent, "SiteCrawler/1.0");
        assert_eq!(config.crawler.recrawl_interval_seconds, None);
        assert_eq!(config.storage.database_path, "./output/crawl.db");
        assert!(config.sites[0].site_type.is_none());
        assert!(!config.sites[0].include_pdf);
    }

    #[test]
    fn test_invalid_toml() {
        let result = parse_config("this is not valid TOML {{{");
        assert!(matches!(result.unwrap_err(), ConfigError::Parse(_)));
    }

    #[test]
    fn test_validation_runs_after_parse() {
        let result = parse_config("[crawler]\nmax-retries = 0\n\n[[site]]\nurl = \"https://example.com\"\n");
        assert!(matches!(result.unwrap_err(), ConfigError::Validation(_)));
    }

    #[test]
    fn test_oversized_delay_is_rejected() {
        let result = parse_config(
            "[crawler]\npoliteness-delay-seconds = 1e30\n\n[[site]]\nurl = \"https://example.com\"\n",
        );
        assert!(matches!(result.unwrap_err(), ConfigError::Validation(_)));
    }

    #[test]
    fn test_missing_file() {
        let result = load_config(Path::new("/nonexistent/config.toml"));
        assert!(matches!(result.unwrap_err(), ConfigError::Io(_)));
    }

    #[test]
    fn test_hash_matches_loaded_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(FULL.as_bytes()).unwrap();
        file.flush().unwrap();

        let (config, hash) = load_config_with_hash(file.path()).unwrap();

        assert_eq!(config.sites.len(), 2);
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, compute_config_hash(file.path()).unwrap());
        assert_ne!(hash, digest("[[site]]\nurl = \"example.com\"\n"));
    }
}
