//! Schema manager configuration
//!
//! Loaded from a JSON file. Every field is optional:
//!
//! ```json
//! {
//!   "poll_interval_ms": 500,
//!   "agreement_timeout_ms": 30000,
//!   "log_level": "info",
//!   "log_format": "compact"
//! }
//! ```
//!
//! Omitting `agreement_timeout_ms` waits for agreement without a deadline.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cluster::AgreementPolicy;
use crate::schema::{SchemaError, SchemaResult};

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

/// Configuration file structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManagerConfig {
    /// Pause between schema version polls (default 500ms)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Give up waiting for agreement after this long (default: never)
    #[serde(default)]
    pub agreement_timeout_ms: Option<u64>,

    /// Filter directive for `tracing-subscriber` (default "info")
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_format: LogFormat,
}

fn default_poll_interval_ms() -> u64 {
    500
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            agreement_timeout_ms: None,
            log_level: default_log_level(),
            log_format: LogFormat::default(),
        }
    }
}

impl ManagerConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> SchemaResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| SchemaError::config(format!("Failed to read config: {}", e)))?;
        Self::from_json(&content)
    }

    /// Parse configuration from a JSON string
    pub fn from_json(content: &str) -> SchemaResult<Self> {
        let config: ManagerConfig = serde_json::from_str(content)
            .map_err(|e| SchemaError::config(format!("Invalid config JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> SchemaResult<()> {
        if self.poll_interval_ms == 0 {
            return Err(SchemaError::config("poll_interval_ms must be > 0"));
        }
        if self.agreement_timeout_ms == Some(0) {
            return Err(SchemaError::config("agreement_timeout_ms must be > 0 when set"));
        }
        if self.log_level.trim().is_empty() {
            return Err(SchemaError::config("log_level must not be empty"));
        }
        Ok(())
    }

    /// Agreement policy described by this configuration
    pub fn agreement_policy(&self) -> AgreementPolicy {
        AgreementPolicy::new(
            Duration::from_millis(self.poll_interval_ms),
            self.agreement_timeout_ms.map(Duration::from_millis),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = ManagerConfig::from_json("{}").unwrap();
        assert_eq!(config, ManagerConfig::default());
        assert_eq!(config.agreement_policy(), AgreementPolicy::unbounded());
    }

    #[test]
    fn test_timeout_becomes_deadline() {
        let config = ManagerConfig::from_json(r#"{"poll_interval_ms": 50, "agreement_timeout_ms": 2000}"#).unwrap();
        let policy = config.agreement_policy();
        assert_eq!(policy.poll_interval, Duration::from_millis(50));
        assert_eq!(policy.timeout, Some(Duration::from_secs(2)));
    }

    #[test]
    fn test_zero_values_rejected() {
        assert!(ManagerConfig::from_json(r#"{"poll_interval_ms": 0}"#).is_err());
        assert!(ManagerConfig::from_json(r#"{"agreement_timeout_ms": 0}"#).is_err());
        assert!(ManagerConfig::from_json(r#"{"log_level": " "}"#).is_err());
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let err = ManagerConfig::from_json(r#"{"poll_interval": 10}"#).unwrap_err();
        assert_eq!(err.code(), crate::schema::SchemaErrorCode::ConfigError);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"log_format": "json", "log_level": "ringschema=debug"}}"#).unwrap();

        let config = ManagerConfig::load(file.path()).unwrap();
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.log_level, "ringschema=debug");
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(ManagerConfig::load(&dir.path().join("missing.json")).is_err());
    }
}
