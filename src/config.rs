//! Daemon configuration.
//!
//! Values come from an optional configuration file (YAML, TOML or JSON)
//! overlaid with `ABAC__`-prefixed environment variables, e.g.
//! `ABAC__SERVER__PORT=8080` or `ABAC__LOGGING__LEVEL=debug`.

use crate::{Error, Result};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const ENV_PREFIX: &str = "ABAC";
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings
    pub server: ServerConfig,
    /// Where policies and definitions are loaded from
    pub policies: PolicySourceConfig,
    /// Condition cache settings
    pub cache: CacheConfig,
    /// Logging settings
    pub logging: LoggingConfig,
}

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind host
    pub host: String,
    /// Bind port
    pub port: u16,
}

impl ServerConfig {
    /// The `host:port` bind address.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5120,
        }
    }
}

/// Policy sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicySourceConfig {
    /// Policy document (YAML or JSON)
    pub file: PathBuf,
    /// Extra shared definitions, merged over the document's own
    pub definitions_file: Option<PathBuf>,
}

impl Default for PolicySourceConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from("policies.yaml"),
            definitions_file: None,
        }
    }
}

/// Condition cache settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Number of compiled programs to reserve room for
    pub initial_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 256,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level when `RUST_LOG` is unset
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl Config {
    /// Load configuration from the environment only.
    pub fn from_env() -> Result<Self> {
        Self::load(None)
    }

    /// Load configuration from a file, overlaid with the environment.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::load(Some(path.as_ref()))
    }

    fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }

        builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()
            .and_then(|settings| settings.try_deserialize())
            .map_err(|e| Error::config(e.to_string()))
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(Error::config_key("port must not be 0", "server.port"));
        }
        if self.server.host.is_empty() {
            return Err(Error::config_key("host must not be empty", "server.host"));
        }
        if self.policies.file.as_os_str().is_empty() {
            return Err(Error::config_key("a policy file is required", "policies.file"));
        }
        if !LOG_LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(Error::config_key(
                format!("unknown log level {:?}", self.logging.level),
                "logging.level",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.addr(), "0.0.0.0:5120");
        assert_eq!(config.policies.file, PathBuf::from("policies.yaml"));
    }

    #[test]
    fn test_from_file_with_partial_sections() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "server:\n  port: 8080\nlogging:\n  level: debug\n  json: true").unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
        assert_eq!(config.cache, CacheConfig::default());
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = Config::from_file("/nonexistent/abac.yaml").unwrap_err();
        assert_eq!(err.category(), "config");
    }

    #[test]
    fn test_validation() {
        let mut config = Config::default();
        config.server.port = 0;
        assert!(matches!(
            config.validate(),
            Err(Error::Config { key: Some(ref key), .. }) if key == "server.port"
        ));

        let mut config = Config::default();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.logging.level = "WARN".to_string();
        assert!(config.validate().is_ok());
    }
}
