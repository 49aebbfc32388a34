//! Configuration loading from disk and environment.

use std::env;
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::AppConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {var}: {reason}")]
    Env { var: &'static str, reason: String },

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration from an optional TOML file, apply environment
/// overrides, then validate.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => AppConfig::default(),
    };

    let config = apply_overrides(config, |var| env::var(var).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay environment variables on a parsed config.
///
/// `lookup` is `std::env::var` in production; tests pass a map.
pub fn apply_overrides<F>(mut config: AppConfig, lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&'static str) -> Option<String>,
{
    if let Some(url) = lookup("REDIS_URL") {
        config.counter_store.url = url;
    }
    if let Some(addr) = lookup("BIND_ADDRESS") {
        config.listener.bind_address = addr;
    }
    if let Some(level) = lookup("LOG_LEVEL") {
        config.observability.log_level = level;
    }
    if let Some(calls) = lookup("RATE_LIMIT_CALLS") {
        config.rate_limit.limit = parse_number("RATE_LIMIT_CALLS", &calls)?;
    }
    if let Some(period) = lookup("RATE_LIMIT_PERIOD") {
        config.rate_limit.period_secs = parse_number("RATE_LIMIT_PERIOD", &period)?;
    }
    if let Some(mode) = lookup("RATE_LIMIT_FAILURE_MODE") {
        config.rate_limit.failure_mode = mode.parse().map_err(|reason| ConfigError::Env {
            var: "RATE_LIMIT_FAILURE_MODE",
            reason,
        })?;
    }

    Ok(config)
}

fn parse_number(var: &'static str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse().map_err(|e: std::num::ParseIntError| ConfigError::Env {
        var,
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::FailureMode;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&'static str, &str)]) -> impl Fn(&'static str) -> Option<String> {
        let map: HashMap<&'static str, String> =
            pairs.iter().map(|(k, v)| (*k, v.to_string())).collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn env_overrides_win_over_file_values() {
        let config = apply_overrides(
            AppConfig::default(),
            env_of(&[
                ("REDIS_URL", "redis://cache:6379/1"),
                ("RATE_LIMIT_CALLS", "5"),
                ("RATE_LIMIT_PERIOD", "10"),
                ("RATE_LIMIT_FAILURE_MODE", "fail-closed"),
            ]),
        )
        .unwrap();

        assert_eq!(config.counter_store.url, "redis://cache:6379/1");
        assert_eq!(config.rate_limit.limit, 5);
        assert_eq!(config.rate_limit.period_secs, 10);
        assert_eq!(config.rate_limit.failure_mode, FailureMode::FailClosed);
    }

    #[test]
    fn bad_number_names_the_variable() {
        let err = apply_overrides(AppConfig::default(), env_of(&[("RATE_LIMIT_CALLS", "lots")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Env { var: "RATE_LIMIT_CALLS", .. }));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load_config(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn oversized_period_in_file_is_rejected() {
        let path = std::env::temp_dir().join(format!("techstore-period-{}.toml", std::process::id()));
        fs::write(&path, "[rate_limit]\nperiod_secs = 9223372036854775807\n").unwrap();

        let result = load_config(Some(&path));
        let _ = fs::remove_file(&path);

        match result {
            Err(ConfigError::Validation(errors)) => {
                assert!(errors.iter().any(|e| e.field == "rate_limit.period_secs"));
            }
            other => panic!("expected a validation error, got {:?}", other.map(|_| ())),
        }
    }
}
