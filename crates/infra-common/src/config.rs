//! Configuration for the transport infrastructure
//!
//! Loaded from a JSON or TOML file, or from `ORTC_*` environment variables,
//! and validated before use.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::logging::{parse_log_level, LoggingConfig};

/// Environment variable overriding the log level
pub const ENV_LOG_LEVEL: &str = "ORTC_LOG_LEVEL";

/// Environment variable enabling JSON logs
pub const ENV_LOG_JSON: &str = "ORTC_LOG_JSON";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// File could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// File could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),

    /// A value is out of range
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Logging section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Level name (`trace` .. `error`)
    pub level: String,
    /// JSON output
    pub json: bool,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Task queue section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueSection {
    /// Queue name used in logs
    pub name: String,
    /// Tasks running longer than this are logged at `warn`; 0 disables
    pub warn_after_ms: u64,
}

impl Default for QueueSection {
    fn default() -> Self {
        Self {
            name: "transport".to_string(),
            warn_after_ms: 5000,
        }
    }
}

impl QueueSection {
    /// Slow task threshold
    pub fn warn_after(&self) -> Option<Duration> {
        (self.warn_after_ms > 0).then(|| Duration::from_millis(self.warn_after_ms))
    }
}

/// Top level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Logging
    pub logging: LoggingSection,
    /// Task queue
    pub queue: QueueSection,
}

impl CoreConfig {
    /// Load from a `.json` or `.toml` file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;

        let config: Self = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => {
                serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?
            }
            Some("toml") => toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?,
            other => {
                return Err(ConfigError::Parse(format!(
                    "unsupported configuration format: {}",
                    other.unwrap_or("<none>")
                )))
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by `ORTC_LOG_LEVEL` and `ORTC_LOG_JSON`
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(level) = std::env::var(ENV_LOG_LEVEL) {
            config.logging.level = level;
        }
        if let Ok(json) = std::env::var(ENV_LOG_JSON) {
            config.logging.json = matches!(json.as_str(), "1" | "true" | "yes");
        }

        config.validate()?;
        Ok(config)
    }

    /// Check every value
    pub fn validate(&self) -> Result<(), ConfigError> {
        parse_log_level(&self.logging.level)?;

        if self.queue.name.is_empty() {
            return Err(ConfigError::Invalid("queue name must not be empty".to_string()));
        }

        Ok(())
    }

    /// Logging configuration derived from the logging section
    pub fn logging_config(&self, app_name: &str) -> Result<LoggingConfig, ConfigError> {
        let mut config = LoggingConfig::new(parse_log_level(&self.logging.level)?, app_name);
        config.json = self.logging.json;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use tracing::Level;

    fn write_temp(name: &str, content: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("ortc-{}-{}", std::process::id(), name));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = CoreConfig::default();
        config.validate().unwrap();
        assert_eq!(config.queue.warn_after(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_from_toml_file() {
        let path = write_temp(
            "config.toml",
            "[logging]\nlevel = \"debug\"\njson = true\n\n[queue]\nname = \"send\"\nwarn_after_ms = 0\n",
        );
        let config = CoreConfig::from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
        assert_eq!(config.queue.name, "send");
        assert_eq!(config.queue.warn_after(), None);

        let logging = config.logging_config("test").unwrap();
        assert_eq!(logging.level, Level::DEBUG);
        assert!(logging.json);
    }

    #[test]
    fn test_from_json_file_partial() {
        let path = write_temp("config.json", r#"{ "queue": { "name": "recv" } }"#);
        let config = CoreConfig::from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.logging, LoggingSection::default());
        assert_eq!(config.queue.name, "recv");
        assert_eq!(config.queue.warn_after_ms, 5000);
    }

    #[test]
    fn test_invalid_values() {
        let path = write_temp("bad.json", r#"{ "logging": { "level": "loud" } }"#);
        let result = CoreConfig::from_file(&path);
        std::fs::remove_file(&path).ok();
        assert!(matches!(result, Err(ConfigError::Invalid(_))));

        let path = write_temp("bad.yaml", "level: debug");
        let result = CoreConfig::from_file(&path);
        std::fs::remove_file(&path).ok();
        assert!(matches!(result, Err(ConfigError::Parse(_))));

        assert!(matches!(
            CoreConfig::from_file("/nonexistent/ortc.toml"),
            Err(ConfigError::Io(_))
        ));
    }
}
