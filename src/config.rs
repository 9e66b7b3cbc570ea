use std::time::Duration;

use thiserror::Error;

use crate::constants::{DEFAULT_USER_AGENT, STREAMABLE_API_BASE};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },
    #[error("failed to parse {name} as integer: {source}")]
    ParseInt {
        name: String,
        #[source]
        source: std::num::ParseIntError,
    },
}

/// Runtime configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // HTTP
    pub user_agent: String,
    pub http_timeout: Duration,
    pub http_connect_timeout: Duration,

    // Extractors
    /// Built-in extractor ids to register, in priority order. `None` registers all.
    pub enabled_extractors: Option<Vec<String>>,
    pub streamable_api_base: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set to a value that cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            // HTTP
            user_agent: env_or_default("MEDIAGET_USER_AGENT", DEFAULT_USER_AGENT),
            http_timeout: Duration::from_secs(parse_env_u64("HTTP_TIMEOUT_SECS", 30)?),
            http_connect_timeout: Duration::from_secs(parse_env_u64(
                "HTTP_CONNECT_TIMEOUT_SECS",
                10,
            )?),

            // Extractors
            enabled_extractors: optional_env("ENABLED_EXTRACTORS").map(|v| parse_list(&v)),
            streamable_api_base: env_or_default("STREAMABLE_API_BASE", STREAMABLE_API_BASE),
        })
    }

    /// Configuration with built-in defaults and no environment lookups.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            http_timeout: Duration::from_secs(10),
            http_connect_timeout: Duration::from_secs(5),
            enabled_extractors: None,
            streamable_api_base: STREAMABLE_API_BASE.to_string(),
        }
    }

    /// Validate that the configuration is usable.
    ///
    /// Extractor ids are checked against `known_extractors` so a typo fails at
    /// startup rather than silently dropping a site.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self, known_extractors: &[&str]) -> Result<(), ConfigError> {
        if self.http_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                name: "HTTP_TIMEOUT_SECS".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.http_connect_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                name: "HTTP_CONNECT_TIMEOUT_SECS".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.user_agent.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                name: "MEDIAGET_USER_AGENT".to_string(),
                message: "cannot be empty".to_string(),
            });
        }
        if url::Url::parse(&self.streamable_api_base).is_err() {
            return Err(ConfigError::InvalidValue {
                name: "STREAMABLE_API_BASE".to_string(),
                message: format!("not a valid URL: '{}'", self.streamable_api_base),
            });
        }
        if let Some(ids) = &self.enabled_extractors {
            if ids.is_empty() {
                return Err(ConfigError::InvalidValue {
                    name: "ENABLED_EXTRACTORS".to_string(),
                    message: "must name at least one extractor".to_string(),
                });
            }
            if let Some(unknown) = ids.iter().find(|id| !known_extractors.contains(&id.as_str())) {
                return Err(ConfigError::InvalidValue {
                    name: "ENABLED_EXTRACTORS".to_string(),
                    message: format!(
                        "unknown extractor '{unknown}', expected one of: {}",
                        known_extractors.join(", ")
                    ),
                });
            }
        }
        Ok(())
    }
}

fn optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_or_default(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_env_u64(name: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}
