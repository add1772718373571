//! Error types for validator operations.
//!
//! Failed validations are not errors: they travel through the channel as
//! [`Outcome`](crate::Outcome) records. These variants cover misuse of the
//! validator itself.

use thiserror::Error;

/// Errors produced by the producer and consumer APIs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidatorError {
    /// The validator was closed, or was closed while a send was parked.
    #[error("validator is closed")]
    Closed,

    /// Another consumer is already draining or searching the channel.
    #[error("another consumer is already receiving from this validator")]
    ConsumerBusy,

    /// A bounded drain gave up before the expected count arrived.
    #[error("drain timed out after receiving {received} of {expected} outcomes")]
    DrainTimedOut { received: u64, expected: u64 },
}

/// Errors produced while loading a [`ValidatorConfig`](crate::ValidatorConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Result type for validator operations.
pub type Result<T> = std::result::Result<T, ValidatorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_timed_out_displays_counts() {
        let err = ValidatorError::DrainTimedOut {
            received: 2,
            expected: 5,
        };
        let msg = err.to_string();
        assert!(msg.contains('2'));
        assert!(msg.contains('5'));
    }

    #[test]
    fn test_config_invalid_display() {
        let err = ConfigError::Invalid("name must not be empty".to_string());
        assert!(err.to_string().contains("invalid config"));
        assert!(err.to_string().contains("name must not be empty"));
    }
}
