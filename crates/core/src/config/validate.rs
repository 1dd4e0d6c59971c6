use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Connection url is an absolute http(s) url
/// - Timeouts and polling budgets are non-zero
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let url = config.connection.url.trim();
    if url.is_empty() {
        return Err(ConfigError::ValidationError(
            "connection.url cannot be empty".to_string(),
        ));
    }
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(ConfigError::ValidationError(format!(
            "connection.url must start with http:// or https://, got '{}'",
            url
        )));
    }
    if config.connection.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "connection.timeout_secs cannot be 0".to_string(),
        ));
    }

    if config.polling.max_attempts == 0 {
        return Err(ConfigError::ValidationError(
            "polling.max_attempts must be at least 1".to_string(),
        ));
    }
    if config.polling.geocoding_interval_secs == 0 {
        return Err(ConfigError::ValidationError(
            "polling.geocoding_interval_secs cannot be 0".to_string(),
        ));
    }

    Ok(())
}
