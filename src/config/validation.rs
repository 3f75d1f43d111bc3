use crate::config::types::{Config, HttpConfig, ServiceOverride, TrackerConfig, WorkerConfig};
use crate::service::ServiceKind;
use crate::ConfigError;
use url::Url;

/// Maximum number of concurrent workers
const MAX_THREADS: u32 = 64;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_tracker_config(&config.tracker)?;
    validate_worker_config(&config.worker)?;
    validate_http_config(&config.http)?;
    for (name, service) in &config.services {
        validate_service_override(name, service)?;
    }
    Ok(())
}

/// Validates tracker configuration
fn validate_tracker_config(config: &TrackerConfig) -> Result<(), ConfigError> {
    validate_http_url("tracker url", &config.url)?;

    if config.version.is_empty() {
        return Err(ConfigError::Validation(
            "tracker version cannot be empty".to_string(),
        ));
    }

    if let Some(username) = &config.username {
        if username.trim().is_empty() {
            return Err(ConfigError::Validation(
                "username cannot be blank when set".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validates worker loop configuration
fn validate_worker_config(config: &WorkerConfig) -> Result<(), ConfigError> {
    if config.threads < 1 || config.threads > MAX_THREADS {
        return Err(ConfigError::Validation(format!(
            "threads must be between 1 and {}, got {}",
            MAX_THREADS, config.threads
        )));
    }

    if config.idle_sleep < 1 {
        return Err(ConfigError::Validation(
            "idle-sleep must be >= 1 second".to_string(),
        ));
    }

    if config.error_sleep < 1 {
        return Err(ConfigError::Validation(
            "error-sleep must be >= 1 second".to_string(),
        ));
    }

    Ok(())
}

/// Validates HTTP client configuration
fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    if config.timeout < 1 || config.connect_timeout < 1 {
        return Err(ConfigError::Validation(format!(
            "timeouts must be >= 1 second, got timeout={} connect-timeout={}",
            config.timeout, config.connect_timeout
        )));
    }

    Ok(())
}

/// Validates one `[services.<name>]` block
fn validate_service_override(name: &str, config: &ServiceOverride) -> Result<(), ConfigError> {
    if name.parse::<ServiceKind>().is_err() {
        return Err(ConfigError::Validation(format!(
            "Unknown service '{}' in [services]",
            name
        )));
    }

    if let Some(base_url) = &config.base_url {
        validate_http_url(&format!("base-url for {}", name), base_url)?;
    }

    match (config.requests_per_window, config.window_seconds) {
        (None, None) => {}
        (Some(requests), Some(window)) => {
            if requests < 1 || window < 1 {
                return Err(ConfigError::Validation(format!(
                    "Rate limit for {} must allow >= 1 request per >= 1 second",
                    name
                )));
            }
        }
        _ => {
            return Err(ConfigError::Validation(format!(
                "Rate limit for {} needs both requests-per-window and window-seconds",
                name
            )));
        }
    }

    Ok(())
}

/// Checks that a URL parses and uses http or https
fn validate_http_url(what: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", what, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must use http or https",
            what, value
        )));
    }

    Ok(())
}
