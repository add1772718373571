//! Validator configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;

/// Environment variable overriding [`ValidatorConfig::drain_timeout_ms`].
pub const ENV_DRAIN_TIMEOUT_MS: &str = "OUTCOME_GATE_DRAIN_TIMEOUT_MS";

/// Environment variable overriding [`ValidatorConfig::name`].
pub const ENV_NAME: &str = "OUTCOME_GATE_NAME";

/// Configuration for a [`Validator`](crate::Validator).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Label attached to log events.
    pub name: String,

    /// Upper bound for a single drain or key search, in milliseconds.
    ///
    /// `None` keeps the blocking contract: a drain waits until every
    /// declared outcome arrives, however long that takes.
    pub drain_timeout_ms: Option<u64>,

    /// Emit a `debug!` event for every outcome the consumer receives.
    pub log_outcomes: bool,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            name: "validator".to_string(),
            drain_timeout_ms: None,
            log_outcomes: false,
        }
    }
}

impl ValidatorConfig {
    /// Parse and validate a JSON document. Missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Apply `OUTCOME_GATE_*` environment overrides.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides_from(|var| std::env::var(var).ok())
    }

    fn with_overrides_from(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(raw) = lookup(ENV_DRAIN_TIMEOUT_MS) {
            let ms = raw.trim().parse::<u64>().map_err(|e| {
                ConfigError::Invalid(format!("{ENV_DRAIN_TIMEOUT_MS}={raw:?}: {e}"))
            })?;
            self.drain_timeout_ms = Some(ms);
        }
        if let Some(name) = lookup(ENV_NAME) {
            self.name = name;
        }
        self.validate()?;
        Ok(self)
    }

    /// Check field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::Invalid("name must not be empty".to_string()));
        }
        if self.drain_timeout_ms == Some(0) {
            return Err(ConfigError::Invalid(
                "drain_timeout_ms must be positive; omit it to wait indefinitely".to_string(),
            ));
        }
        Ok(())
    }

    pub fn drain_timeout(&self) -> Option<Duration> {
        self.drain_timeout_ms.map(Duration::from_millis)
    }
}
