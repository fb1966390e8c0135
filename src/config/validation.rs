use crate::config::types::{Config, HttpSettings, RetryPolicy, SourceConfig};
use crate::model::SourceKind;
use crate::ConfigError;
use reqwest::header::HeaderValue;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_http_settings(&config.http)?;
    validate_retry_policy(&config.retry)?;

    if config.logging.log_file.trim().is_empty() {
        return Err(ConfigError::Validation(
            "log_file cannot be empty".to_string(),
        ));
    }

    for kind in SourceKind::ALL {
        validate_source_config(kind, config.sources.get(kind))?;
    }

    Ok(())
}

/// Validates headers and timeouts
fn validate_http_settings(config: &HttpSettings) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    for (name, value) in [
        ("user_agent", &config.user_agent),
        ("accept", &config.accept),
        ("accept_language", &config.accept_language),
    ] {
        if HeaderValue::from_str(value).is_err() {
            return Err(ConfigError::Validation(format!(
                "{} is not a valid header value: '{}'",
                name, value
            )));
        }
    }

    // Every request must be bounded in time
    if config.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.connect_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "connect_timeout_secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates the retry policy
fn validate_retry_policy(config: &RetryPolicy) -> Result<(), ConfigError> {
    if !config.backoff_factor.is_finite() || config.backoff_factor < 0.0 {
        return Err(ConfigError::Validation(format!(
            "backoff_factor must be a finite number >= 0, got {}",
            config.backoff_factor
        )));
    }

    if !config.backoff_max_secs.is_finite() || config.backoff_max_secs < 0.0 {
        return Err(ConfigError::Validation(format!(
            "backoff_max_secs must be a finite number >= 0, got {}",
            config.backoff_max_secs
        )));
    }

    if let Some(status) = config
        .status_forcelist
        .iter()
        .find(|status| !(400..=599).contains(*status))
    {
        return Err(ConfigError::Validation(format!(
            "status_forcelist may only contain error statuses (400-599), got {}",
            status
        )));
    }

    Ok(())
}

/// Validates one `[sources.<name>]` table
fn validate_source_config(kind: SourceKind, config: &SourceConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url).map_err(|e| {
        ConfigError::InvalidUrl(format!(
            "Invalid base_url for {}: '{}': {}",
            kind, config.base_url, e
        ))
    })?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url for {} must use http or https, got '{}'",
            kind, config.base_url
        )));
    }

    if config.output_dir.trim().is_empty() {
        return Err(ConfigError::Validation(format!(
            "output_dir for {} cannot be empty",
            kind
        )));
    }

    if config.max_workers < 1 || config.max_workers > 100 {
        return Err(ConfigError::Validation(format!(
            "max_workers for {} must be between 1 and 100, got {}",
            kind, config.max_workers
        )));
    }

    if config.batch_size < 1 {
        return Err(ConfigError::Validation(format!(
            "batch_size for {} must be >= 1, got {}",
            kind, config.batch_size
        )));
    }

    if !config.delay_min.is_finite() || !config.delay_max.is_finite() || config.delay_min < 0.0 {
        return Err(ConfigError::Validation(format!(
            "delay bounds for {} must be finite and >= 0, got [{}, {}]",
            kind, config.delay_min, config.delay_max
        )));
    }

    if config.delay_min > config.delay_max {
        return Err(ConfigError::Validation(format!(
            "delay_min for {} must not exceed delay_max, got [{}, {}]",
            kind, config.delay_min, config.delay_max
        )));
    }

    Ok(())
}
