use crate::config::types::{
    Config, DiscoveryConfig, ExtractionConfig, OutputConfig, RetryConfig, ThrottleConfig,
};
use crate::ConfigError;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_throttle_config(&config.throttle)?;
    validate_discovery_config(&config.discovery)?;
    validate_extraction_config(&config.extraction)?;
    validate_output_config(&config.output)?;
    validate_retry_config(&config.retry)?;
    Ok(())
}

fn validate_throttle_config(config: &ThrottleConfig) -> Result<(), ConfigError> {
    if config.max_adaptive_delay_ms < config.request_delay_ms {
        return Err(ConfigError::Validation(format!(
            "max_adaptive_delay_ms ({}) must be >= request_delay_ms ({})",
            config.max_adaptive_delay_ms, config.request_delay_ms
        )));
    }

    if config.decay_interval < 1 {
        return Err(ConfigError::Validation(
            "decay_interval must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_discovery_config(config: &DiscoveryConfig) -> Result<(), ConfigError> {
    if config.trusted_domains.is_empty() {
        return Err(ConfigError::Validation(
            "trusted_domains must name at least one hosting domain".to_string(),
        ));
    }

    for pattern in &config.trusted_domains {
        validate_domain_pattern(pattern)?;
    }

    if config.sample_pages < 1 {
        return Err(ConfigError::Validation(
            "sample_pages must be >= 1".to_string(),
        ));
    }

    if config.default_page_size < 1 {
        return Err(ConfigError::Validation(
            "default_page_size must be >= 1".to_string(),
        ));
    }

    if config.max_listing_retries < 1 {
        return Err(ConfigError::Validation(
            "max_listing_retries must be >= 1".to_string(),
        ));
    }

    if config.listing_backoff_cap_ms < config.listing_backoff_base_ms {
        return Err(ConfigError::Validation(format!(
            "listing_backoff_cap_ms ({}) must be >= listing_backoff_base_ms ({})",
            config.listing_backoff_cap_ms, config.listing_backoff_base_ms
        )));
    }

    Ok(())
}

fn validate_extraction_config(config: &ExtractionConfig) -> Result<(), ConfigError> {
    if config.max_workers < 1 || config.max_workers > 50 {
        return Err(ConfigError::Validation(format!(
            "max_workers must be between 1 and 50, got {}",
            config.max_workers
        )));
    }

    if config.retry_base < 2 {
        return Err(ConfigError::Validation(format!(
            "retry_base must be >= 2, got {}",
            config.retry_base
        )));
    }

    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.directory.is_empty() {
        return Err(ConfigError::Validation(
            "output directory cannot be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_retry_config(config: &RetryConfig) -> Result<(), ConfigError> {
    if config.retry_delays_secs.is_empty() {
        return Err(ConfigError::Validation(
            "retry_delays_secs must contain at least one delay".to_string(),
        ));
    }
    Ok(())
}

/// Validates a domain pattern (supports a leading "*." wildcard)
fn validate_domain_pattern(pattern: &str) -> Result<(), ConfigError> {
    if pattern.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain pattern cannot be empty".to_string(),
        ));
    }

    match pattern.strip_prefix("*.") {
        Some(domain) => validate_domain_string(domain),
        None => validate_domain_string(pattern),
    }
}

/// Validates a domain string (without wildcard prefix)
fn validate_domain_string(domain: &str) -> Result<(), ConfigError> {
    if domain.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain cannot be empty".to_string(),
        ));
    }

    if !domain
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' contains invalid characters",
            domain
        )));
    }

    if domain.starts_with('.')
        || domain.ends_with('.')
        || domain.starts_with('-')
        || domain.ends_with('-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot start or end with '.' or '-'",
            domain
        )));
    }

    if domain.contains("..") {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot contain consecutive dots",
            domain
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' must contain at least one dot (e.g., 'avature.net')",
            domain
        )));
    }

    Ok(())
}
