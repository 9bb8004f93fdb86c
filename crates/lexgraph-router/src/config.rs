//! Configuration file parsing for the Router.
//!
//! Loads settings from TOML files including bind address, request timeout,
//! case database location, engine bounds and the predictor endpoint.

use lexgraph_engine::EngineConfig;
use lexgraph_predict::{DEFAULT_ENDPOINT, DEFAULT_TIMEOUT_SECS};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Router configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse config TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Missing required field
    #[error("Missing required configuration field: {0}")]
    MissingField(String),

    /// Field present but out of range
    #[error("Invalid configuration value for {field}: {reason}")]
    InvalidValue {
        /// Offending field
        field: String,
        /// What is wrong with it
        reason: String,
    },
}

/// Router configuration loaded from TOML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Bind address (e.g., "127.0.0.1")
    pub bind_address: String,

    /// Bind port (e.g., 8080)
    pub bind_port: u16,

    /// Per-request deadline in seconds (default: 30)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// SQLite case database (":memory:" for a throwaway store)
    pub database_path: String,

    /// Engine cache and size bounds
    #[serde(default)]
    pub engine: EngineConfig,

    /// Conflict predictor service
    #[serde(default)]
    pub prediction: PredictionConfig,
}

/// Predictor service configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionConfig {
    /// Base URL of the predictor
    #[serde(default = "default_prediction_endpoint")]
    pub endpoint: String,

    /// Request timeout in seconds
    #[serde(default = "default_prediction_timeout")]
    pub timeout_secs: u64,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            endpoint: default_prediction_endpoint(),
            timeout_secs: default_prediction_timeout(),
        }
    }
}

impl PredictionConfig {
    /// Request timeout as a duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_request_timeout() -> u64 {
    30
}

fn default_prediction_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_prediction_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl RouterConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: RouterConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Check required fields and value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database_path.is_empty() {
            return Err(ConfigError::MissingField("database_path".to_string()));
        }
        if self.prediction.endpoint.is_empty() {
            return Err(ConfigError::MissingField("prediction.endpoint".to_string()));
        }

        let positive = [
            ("request_timeout_secs", self.request_timeout_secs as usize),
            ("prediction.timeout_secs", self.prediction.timeout_secs as usize),
            ("engine.cache_capacity", self.engine.cache_capacity),
            ("engine.max_nodes", self.engine.max_nodes),
            ("engine.max_edges", self.engine.max_edges),
            ("engine.default_max_hops", self.engine.default_max_hops),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    reason: "must be greater than zero".to_string(),
                });
            }
        }

        if self.engine.default_max_hops > self.engine.max_hops_limit {
            return Err(ConfigError::InvalidValue {
                field: "engine.default_max_hops".to_string(),
                reason: format!("exceeds max_hops_limit ({})", self.engine.max_hops_limit),
            });
        }

        Ok(())
    }

    /// Create a default configuration for testing
    pub fn default_test_config() -> Self {
        RouterConfig {
            bind_address: "127.0.0.1".to_string(),
            bind_port: 8080,
            request_timeout_secs: default_request_timeout(),
            database_path: ":memory:".to_string(),
            engine: EngineConfig::default(),
            prediction: PredictionConfig::default(),
        }
    }

    /// Get the full bind address (address:port)
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.bind_port)
    }

    /// Request deadline as a duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RouterConfig::default_test_config();
        assert_eq!(config.bind_address, "127.0.0.1");
        assert_eq!(config.bind_port, 8080);
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.prediction.endpoint, "http://localhost:8090");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_bind_addr() {
        let config = RouterConfig::default_test_config();
        assert_eq!(config.bind_addr(), "127.0.0.1:8080");
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
            bind_address = "0.0.0.0"
            bind_port = 9000
            request_timeout_secs = 5
            database_path = "/var/lib/lexgraph/cases.db"

            [engine]
            cache_capacity = 64
            max_hops_limit = 8

            [prediction]
            endpoint = "http://predictor:8090"
            timeout_secs = 3
        "#;

        let config: RouterConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.bind_port, 9000);
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.database_path, "/var/lib/lexgraph/cases.db");
        assert_eq!(config.engine.cache_capacity, 64);
        assert_eq!(config.engine.max_hops_limit, 8);
        // Unset engine fields keep their defaults
        assert_eq!(config.engine.max_nodes, 10_000);
        assert_eq!(config.prediction.timeout(), Duration::from_secs(3));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_sections_are_optional() {
        let toml = r#"
            bind_address = "127.0.0.1"
            bind_port = 8080
            database_path = "cases.db"
        "#;

        let config: RouterConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.engine, EngineConfig::default());
        assert_eq!(config.prediction, PredictionConfig::default());
        assert_eq!(config.request_timeout_secs, 30);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = RouterConfig::default_test_config();
        config.database_path.clear();
        assert!(matches!(config.validate(), Err(ConfigError::MissingField(f)) if f == "database_path"));

        let mut config = RouterConfig::default_test_config();
        config.request_timeout_secs = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field, .. }) if field == "request_timeout_secs"
        ));

        let mut config = RouterConfig::default_test_config();
        config.engine.default_max_hops = config.engine.max_hops_limit + 1;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field, .. }) if field == "engine.default_max_hops"
        ));
    }

    #[test]
    fn test_from_file_missing() {
        let result = RouterConfig::from_file("/nonexistent/lexgraph-router.toml");
        assert!(matches!(result, Err(ConfigError::FileRead(_))));
    }
}
