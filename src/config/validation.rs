use crate::config::types::{Config, HarvestDefaults, HttpConfig, LimitsConfig, SourceConfig};
use crate::ConfigError;
use scraper::Selector;
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_http_config(&config.http)?;
    validate_limits(&config.limits)?;
    validate_harvest_defaults(&config.harvest, &config.limits)?;

    if config.cache.max_entries < 1 {
        return Err(ConfigError::Validation(
            "cache max-entries must be >= 1".to_string(),
        ));
    }

    validate_sources(&config.sources)?;
    Ok(())
}

fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    if config.max_connections < 1 || config.max_connections > 100 {
        return Err(ConfigError::Validation(format!(
            "max-connections must be between 1 and 100, got {}",
            config.max_connections
        )));
    }

    if config.max_idle_per_host > config.max_connections {
        return Err(ConfigError::Validation(format!(
            "max-idle-per-host ({}) cannot exceed max-connections ({})",
            config.max_idle_per_host, config.max_connections
        )));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "timeout-secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_limits(limits: &LimitsConfig) -> Result<(), ConfigError> {
    if limits.max_page_window < 1 {
        return Err(ConfigError::Validation(
            "max-page-window must be >= 1".to_string(),
        ));
    }

    if limits.max_retries < 1 {
        return Err(ConfigError::Validation(
            "limits max-retries must be >= 1".to_string(),
        ));
    }

    if limits.min_request_delay_ms > limits.max_request_delay_ms {
        return Err(ConfigError::Validation(format!(
            "min-request-delay-ms ({}) exceeds max-request-delay-ms ({})",
            limits.min_request_delay_ms, limits.max_request_delay_ms
        )));
    }

    if limits.min_timeout_secs > limits.max_timeout_secs {
        return Err(ConfigError::Validation(format!(
            "min-timeout-secs ({}) exceeds max-timeout-secs ({})",
            limits.min_timeout_secs, limits.max_timeout_secs
        )));
    }

    Ok(())
}

/// The defaults must themselves pass request validation
fn validate_harvest_defaults(
    defaults: &HarvestDefaults,
    limits: &LimitsConfig,
) -> Result<(), ConfigError> {
    if defaults.max_retries < 1 || defaults.max_retries > limits.max_retries {
        return Err(ConfigError::Validation(format!(
            "harvest max-retries must be between 1 and {}, got {}",
            limits.max_retries, defaults.max_retries
        )));
    }

    if defaults.request_delay_ms < limits.min_request_delay_ms
        || defaults.request_delay_ms > limits.max_request_delay_ms
    {
        return Err(ConfigError::Validation(format!(
            "harvest request-delay-ms must be between {} and {}, got {}",
            limits.min_request_delay_ms, limits.max_request_delay_ms, defaults.request_delay_ms
        )));
    }

    if defaults.timeout_secs < limits.min_timeout_secs
        || defaults.timeout_secs > limits.max_timeout_secs
    {
        return Err(ConfigError::Validation(format!(
            "harvest timeout-secs must be between {} and {}, got {}",
            limits.min_timeout_secs, limits.max_timeout_secs, defaults.timeout_secs
        )));
    }

    Ok(())
}

fn validate_sources(sources: &[SourceConfig]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for source in sources {
        if source.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "source name cannot be empty".to_string(),
            ));
        }

        if !seen.insert(source.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate source name '{}'",
                source.name
            )));
        }

        let url = Url::parse(&source.url).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid URL for source '{}': {}", source.name, e))
        })?;

        if url.scheme() != "https" && url.scheme() != "http" {
            return Err(ConfigError::InvalidUrl(format!(
                "Source '{}' must use http or https, got '{}'",
                source.name,
                url.scheme()
            )));
        }

        if source.ttl_secs == 0 {
            return Err(ConfigError::Validation(format!(
                "Source '{}' must have a ttl-secs > 0",
                source.name
            )));
        }

        if let Some(param) = &source.page_param {
            if param.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "Source '{}' has an empty page-param",
                    source.name
                )));
            }
        }

        validate_selector(&source.item_selector)?;
        for selector in source.fields.values() {
            validate_selector(selector)?;
        }
        if let Some(link) = &source.link_selector {
            validate_selector(link)?;
        }
        for selector in source.detail_fields.values() {
            validate_selector(selector)?;
        }
    }

    Ok(())
}

fn validate_selector(selector: &str) -> Result<(), ConfigError> {
    Selector::parse(selector)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidSelector(format!("'{}': {:?}", selector, e)))
}
