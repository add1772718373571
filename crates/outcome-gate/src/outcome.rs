//! Outcome records and the aggregated failure map.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Failure messages grouped by key, in the order they were received.
///
/// Keys whose outcomes were all successes are absent.
pub type FailureMap = HashMap<String, Vec<String>>;

/// One validation result handed from a check to the consumer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    /// Which logical check produced this outcome. Not unique.
    pub key: String,

    /// Human-readable failure text; empty for successes.
    pub message: String,

    /// Whether `message` should be surfaced by a drain.
    pub is_failure: bool,
}

impl Outcome {
    pub fn new(key: impl Into<String>, message: impl Into<String>, is_failure: bool) -> Self {
        Self {
            key: key.into(),
            message: message.into(),
            is_failure,
        }
    }

    /// A failure outcome carrying `message`.
    pub fn failure(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(key, message, true)
    }

    /// A success outcome with an empty message.
    pub fn success(key: impl Into<String>) -> Self {
        Self::new(key, String::new(), false)
    }
}

/// Fold one received outcome into `map`. Successes are discarded.
pub(crate) fn classify_into(map: &mut FailureMap, outcome: Outcome) -> bool {
    if !outcome.is_failure {
        return false;
    }
    map.entry(outcome.key).or_default().push(outcome.message);
    true
}
