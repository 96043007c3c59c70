use crate::config::types::{
    ApiConfig, CatalogConfig, Config, FetcherConfig, IngestConfig, OutputConfig,
};
use crate::ConfigError;
use reqwest::header::{HeaderName, HeaderValue};
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_api_config(&config.api)?;
    validate_fetcher_config(&config.fetcher)?;
    validate_ingest_config(&config.ingest)?;
    validate_catalog_config(&config.catalog)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates upstream API configuration
fn validate_api_config(config: &ApiConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url must use HTTP or HTTPS, got '{}'",
            config.base_url
        )));
    }

    for key in config.params.keys() {
        if key.is_empty() || key.contains(['&', '=']) {
            return Err(ConfigError::Validation(format!(
                "Invalid query parameter name '{}'",
                key
            )));
        }
    }

    for (name, value) in &config.headers {
        HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ConfigError::InvalidHeader(format!("'{}': {}", name, e)))?;
        HeaderValue::from_str(value)
            .map_err(|e| ConfigError::InvalidHeader(format!("'{}' value: {}", name, e)))?;
    }

    Ok(())
}

/// Validates fetcher retry policy
fn validate_fetcher_config(config: &FetcherConfig) -> Result<(), ConfigError> {
    if config.retries < 1 {
        return Err(ConfigError::Validation(format!(
            "retries must be >= 1, got {}",
            config.retries
        )));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "timeout-secs must be >= 1, got {}",
            config.timeout_secs
        )));
    }

    if config.retry_delay_min_ms > config.retry_delay_max_ms {
        return Err(ConfigError::Validation(format!(
            "retry-delay-min-ms ({}) must not exceed retry-delay-max-ms ({})",
            config.retry_delay_min_ms, config.retry_delay_max_ms
        )));
    }

    Ok(())
}

/// Validates pagination settings
fn validate_ingest_config(config: &IngestConfig) -> Result<(), ConfigError> {
    if config.max_consecutive_errors < 1 {
        return Err(ConfigError::Validation(format!(
            "max-consecutive-errors must be >= 1, got {}",
            config.max_consecutive_errors
        )));
    }

    if config.max_pages == Some(0) {
        return Err(ConfigError::Validation(
            "max-pages must be >= 1 when set".to_string(),
        ));
    }

    if config.max_probe_page < 1 {
        return Err(ConfigError::Validation(format!(
            "max-probe-page must be >= 1, got {}",
            config.max_probe_page
        )));
    }

    Ok(())
}

/// Validates category tree source
fn validate_catalog_config(config: &CatalogConfig) -> Result<(), ConfigError> {
    if config.tree_path.is_empty() {
        return Err(ConfigError::Validation(
            "tree-path cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }

    if !is_identifier(&config.table) {
        return Err(ConfigError::Validation(format!(
            "table must be a plain SQL identifier, got '{}'",
            config.table
        )));
    }

    Ok(())
}

/// Checks for `[A-Za-z_][A-Za-z0-9_]*`
pub(crate) fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
