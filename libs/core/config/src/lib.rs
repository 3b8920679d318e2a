pub mod broker;
pub mod tracing;

use std::env;
use std::str::FromStr;
use thiserror::Error;

/// Configuration error type
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Environment variable '{0}' is required but not set")]
    MissingEnvVar(String),

    #[error("Failed to parse environment variable '{key}': {details}")]
    ParseError { key: String, details: String },
}

/// Application environment, drives log formatting
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Environment {
    Development, // Pretty logs
    Production,  // JSON logs
}

impl Environment {
    pub fn from_env() -> Self {
        let app_env = env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        if app_env.eq_ignore_ascii_case("production") {
            Environment::Production
        } else {
            Environment::Development
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    pub fn is_development(&self) -> bool {
        matches!(self, Environment::Development)
    }
}

/// Trait for configuration that can be loaded from environment variables
pub trait FromEnv: Sized {
    fn from_env() -> Result<Self, ConfigError>;
}

/// Helper to load and parse environment variable with a default value
pub fn env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Helper to load and parse environment variable or return error
pub fn env_required(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Optional variable; empty values count as unset
pub fn env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Parse a variable into `T`, falling back to `default` when unset
pub fn env_parse<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_optional(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::ParseError {
            key: key.to_string(),
            details: e.to_string(),
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_from_app_env() {
        temp_env::with_var_unset("APP_ENV", || {
            assert!(Environment::from_env().is_development());
        });
        for value in ["production", "PRODUCTION", "Production"] {
            temp_env::with_var("APP_ENV", Some(value), || {
                assert_eq!(Environment::from_env(), Environment::Production);
            });
        }
        temp_env::with_var("APP_ENV", Some("staging"), || {
            assert_eq!(Environment::from_env(), Environment::Development);
        });
    }

    #[test]
    fn test_env_or_default() {
        temp_env::with_var("RESULT_ENDPOINT", Some("http://store/results"), || {
            assert_eq!(env_or_default("RESULT_ENDPOINT", "http://app"), "http://store/results");
        });
        temp_env::with_var_unset("RESULT_ENDPOINT", || {
            assert_eq!(env_or_default("RESULT_ENDPOINT", "http://app"), "http://app");
        });
    }

    #[test]
    fn test_env_required() {
        temp_env::with_var("CATALOG_PATH", Some("/data/catalog.json"), || {
            assert_eq!(env_required("CATALOG_PATH").unwrap(), "/data/catalog.json");
        });
        temp_env::with_var_unset("CATALOG_PATH", || {
            let err = env_required("CATALOG_PATH").unwrap_err();
            assert_eq!(
                err.to_string(),
                "Environment variable 'CATALOG_PATH' is required but not set"
            );
        });
    }

    #[test]
    fn test_env_optional_treats_blank_as_unset() {
        temp_env::with_var("SCORER_MODEL_PATH", Some("  "), || {
            assert_eq!(env_optional("SCORER_MODEL_PATH"), None);
        });
    }

    #[test]
    fn test_env_parse_default_and_value() {
        temp_env::with_var_unset("RECONNECT_DELAY_SECS", || {
            assert_eq!(env_parse("RECONNECT_DELAY_SECS", 5u64).unwrap(), 5);
        });
        temp_env::with_var("RECONNECT_DELAY_SECS", Some(" 12 "), || {
            assert_eq!(env_parse("RECONNECT_DELAY_SECS", 5u64).unwrap(), 12);
        });
    }

    #[test]
    fn test_env_parse_invalid() {
        temp_env::with_var("RECONNECT_DELAY_SECS", Some("five"), || {
            let err = env_parse::<u64>("RECONNECT_DELAY_SECS", 5).unwrap_err();
            assert!(
                matches!(err, ConfigError::ParseError { ref key, .. } if key == "RECONNECT_DELAY_SECS")
            );
        });
    }
}
