//! outcome-gate
//!
//! Aggregates pass/fail outcomes from concurrently running validation checks:
//! - Checks declare how many outcomes to expect, then each hands off one
//!   keyed outcome over a zero-capacity channel
//! - A single consumer drains exactly that many and groups failure
//!   messages by key
//! - A consumer can also peek for one key and put everything back
//!
//! ```ignore
//! let v = Arc::new(Validator::new());
//! v.declare_expected(2);
//! check_condition!(v, "port", port > 0, "port must be positive, got {}", port);
//! record_failure!(v, "host", "unresolvable host {}", host);
//! let failures = v.collect_failures_and_close().await?;
//! ```

pub mod config;
pub mod error;
mod handoff;
pub mod metrics;
pub mod obs;
pub mod outcome;
pub mod telemetry;
pub mod validator;

pub use config::ValidatorConfig;
pub use error::{ConfigError, Result, ValidatorError};
pub use metrics::METRICS;
pub use outcome::{FailureMap, Outcome};
pub use telemetry::init_tracing;
pub use validator::Validator;

/// outcome-gate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Format a message and record it as a detached failure.
///
/// `record_failure!(validator, key, "template {}", args..)` expands to
/// `validator.record_failure(key, format!(..))`.
#[macro_export]
macro_rules! record_failure {
    ($validator:expr, $key:expr, $($arg:tt)+) => {
        $validator.record_failure($key, ::std::format!($($arg)+))
    };
}

/// Evaluate a condition and record a detached success or failure.
///
/// The message is only formatted when the condition is false.
#[macro_export]
macro_rules! check_condition {
    ($validator:expr, $key:expr, $cond:expr, $($arg:tt)+) => {{
        let validator = &$validator;
        if $cond {
            validator.record_success($key)
        } else {
            validator.record_failure($key, ::std::format!($($arg)+))
        }
    }};
}
