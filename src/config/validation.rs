use crate::config::types::{Config, CrawlerSettings, SiteSpec, StorageConfig, MAX_DELAY_SECONDS};
use crate::url::normalize_url;
use crate::ConfigError;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_settings(&config.crawler)?;
    validate_storage_config(&config.storage)?;
    validate_sites(&config.sites)?;
    Ok(())
}

/// Validates crawler settings
fn validate_crawler_settings(settings: &CrawlerSettings) -> Result<(), ConfigError> {
    // max_depth >= 0 is always true for u32, so no check needed

    if settings.max_retries < 1 {
        return Err(ConfigError::Validation(format!(
            "max_retries must be >= 1, got {}",
            settings.max_retries
        )));
    }

    if settings.request_timeout_seconds < 1 {
        return Err(ConfigError::Validation(format!(
            "request_timeout_seconds must be >= 1, got {}",
            settings.request_timeout_seconds
        )));
    }

    validate_delay("retry_delay_seconds", settings.retry_delay_seconds)?;
    validate_delay("politeness_delay_seconds", settings.politeness_delay_seconds)?;
    validate_delay("shutdown_timeout_seconds", settings.shutdown_timeout_seconds)?;

    if settings.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Delays must be finite and within `0..=MAX_DELAY_SECONDS`
fn validate_delay(name: &str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ConfigError::Validation(format!(
            "{} must be a non-negative number, got {}",
            name, value
        )));
    }

    if value > MAX_DELAY_SECONDS {
        return Err(ConfigError::Validation(format!(
            "{} must be at most {} seconds, got {}",
            name, MAX_DELAY_SECONDS, value
        )));
    }

    Ok(())
}

/// Validates storage configuration
fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.output_dir.is_empty() {
        return Err(ConfigError::Validation(
            "output_dir cannot be empty".to_string(),
        ));
    }

    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates site entries
fn validate_sites(sites: &[SiteSpec]) -> Result<(), ConfigError> {
    if sites.is_empty() {
        return Err(ConfigError::Validation(
            "At least one [[site]] must be configured".to_string(),
        ));
    }

    for site in sites {
        normalize_url(&site.url).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid site URL '{}': {}", site.url, e))
        })?;

        if let Some(domains) = &site.allowed_domains {
            for domain in domains {
                validate_domain_pattern(domain)?;
            }
        }
    }

    Ok(())
}

/// Validates a domain pattern
///
/// Valid patterns:
/// - "example.com" (the domain and its subdomains)
/// - "*.example.com" (same meaning)
///
/// Invalid patterns:
/// - "" (empty)
/// - "*example.com" (wildcard not followed by a dot)
/// - "example.com/path" (contains path or other URL parts)
fn validate_domain_pattern(pattern: &str) -> Result<(), ConfigError> {
    let base = pattern.strip_prefix("*.").unwrap_or(pattern);

    if base.trim().is_empty() {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain pattern cannot be empty: '{}'",
            pattern
        )));
    }

    if base.contains(['*', '/', ':', '?', '#', ' ']) {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain pattern must be a bare host: '{}'",
            pattern
        )));
    }

    Ok(())
}
