//! Structured observability hooks for validator sessions.
//!
//! This module provides:
//! - A session-scoped span for drains and key searches via [`drain_span`]
//! - Emission functions for lifecycle events: create, declare, drain, probe,
//!   restore, reject, close, reset
//!
//! Events are emitted at `info!` level unless noted (configurable via `RUST_LOG`).

use tracing::{debug, info, trace, warn, Span};
use uuid::Uuid;

/// Span covering one consumer operation on a session.
///
/// Attach it with `tracing::Instrument` so the consumer future stays `Send`.
pub fn drain_span(session_id: Uuid, operation: &'static str) -> Span {
    tracing::info_span!("outcome_gate.drain", session_id = %session_id, operation)
}

/// Emit event: validator session opened.
pub fn emit_validator_created(session_id: Uuid, name: &str) {
    info!(event = "validator.created", session_id = %session_id, name = %name);
}

/// Emit event: expected count raised (trace level; called once per check).
pub fn emit_expected_declared(session_id: Uuid, added: u64, total: u64) {
    trace!(event = "validator.declared", session_id = %session_id, added, total);
}

/// Emit event: drain started.
pub fn emit_drain_started(session_id: Uuid, expected: u64) {
    info!(event = "drain.started", session_id = %session_id, expected);
}

/// Emit event: drain finished with failure summary.
pub fn emit_drain_finished(session_id: Uuid, received: u64, failing_keys: usize, duration_ms: u64) {
    info!(
        event = "drain.finished",
        session_id = %session_id,
        received,
        failing_keys,
        duration_ms,
    );
}

/// Emit event: one outcome received (debug level, opt-in via config).
pub fn emit_outcome_received(session_id: Uuid, key: &str, is_failure: bool) {
    debug!(event = "outcome.received", session_id = %session_id, key = %key, is_failure);
}

/// Emit event: a key search finished.
pub fn emit_key_probed(session_id: Uuid, key: &str, found: bool, scanned: usize) {
    info!(event = "key.probed", session_id = %session_id, key = %key, found, scanned);
}

/// Emit event: searched outcomes handed back to the channel.
pub fn emit_outcomes_restored(session_id: Uuid, count: usize) {
    debug!(event = "outcomes.restored", session_id = %session_id, count);
}

/// Emit event: a send hit a closed validator (warning level).
pub fn emit_send_rejected(session_id: Option<Uuid>, key: &str, error: &dyn std::fmt::Display) {
    match session_id {
        Some(id) => warn!(event = "send.rejected", session_id = %id, key = %key, error = %error),
        None => warn!(event = "send.rejected", key = %key, error = %error),
    }
}

/// Emit event: validator closed.
pub fn emit_validator_closed(session_id: Uuid) {
    info!(event = "validator.closed", session_id = %session_id);
}

/// Emit event: validator re-opened in place under a new session.
pub fn emit_validator_reset(previous: Option<Uuid>, session_id: Uuid) {
    match previous {
        Some(prev) => info!(event = "validator.reset", previous = %prev, session_id = %session_id),
        None => info!(event = "validator.reset", session_id = %session_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_span_create() {
        let span = drain_span(Uuid::new_v4(), "collect");
        let _entered = span.enter();
    }
}
