//! The validator: expected-count bookkeeping plus the producer and
//! consumer sides of the handoff channel.
//!
//! Producers call [`Validator::declare_expected`] once per check and then
//! hand exactly one outcome each to the channel, usually through the
//! detached helpers ([`record_failure`](Validator::record_failure),
//! [`record_success`](Validator::record_success),
//! [`check_condition`](Validator::check_condition)). A single consumer then
//! drains with [`collect_failures`](Validator::collect_failures), which
//! returns once the declared number of outcomes has arrived.
//!
//! The count must match the sends exactly. Declaring more than will be sent
//! leaves the drain waiting forever (unless a drain timeout is configured);
//! sending more than declared leaves the extras parked until the validator
//! is closed, at which point they fail.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::ValidatorConfig;
use crate::error::{Result, ValidatorError};
use crate::handoff::{rendezvous, HandoffCloser, HandoffReceiver, HandoffSender, RecvError};
use crate::metrics::METRICS;
use crate::obs;
use crate::outcome::{classify_into, FailureMap, Outcome};

/// One open channel generation. Replaced wholesale by [`Validator::reset`].
struct Session {
    id: Uuid,
    tx: HandoffSender,
    rx: Arc<Mutex<HandoffReceiver>>,
    closer: HandoffCloser,
}

impl Session {
    fn open() -> Self {
        let (tx, rx, closer) = rendezvous();
        Self {
            id: Uuid::new_v4(),
            tx,
            rx: Arc::new(Mutex::new(rx)),
            closer,
        }
    }
}

/// Aggregates pass/fail outcomes from concurrently running checks.
///
/// Share it by reference (typically `Arc<Validator>`) between the checks
/// and the consumer. Detached recording helpers spawn onto the ambient
/// Tokio runtime and must be called from within one.
pub struct Validator {
    config: ValidatorConfig,
    expected: AtomicU64,
    session: RwLock<Option<Session>>,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Validator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Validator")
            .field("name", &self.config.name)
            .field("expected", &self.expected())
            .field("session_id", &self.session_id())
            .finish()
    }
}

impl Validator {
    /// Open a validator with the default configuration (no drain timeout).
    pub fn new() -> Self {
        Self::with_config(ValidatorConfig::default())
    }

    pub fn with_config(config: ValidatorConfig) -> Self {
        let session = Session::open();
        obs::emit_validator_created(session.id, &config.name);
        Self {
            config,
            expected: AtomicU64::new(0),
            session: RwLock::new(Some(session)),
        }
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Number of outcomes the next drain will wait for.
    pub fn expected(&self) -> u64 {
        self.expected.load(Ordering::Acquire)
    }

    /// Identifier of the current channel generation; `None` once closed.
    pub fn session_id(&self) -> Option<Uuid> {
        self.session.read().as_ref().map(|s| s.id)
    }

    pub fn is_closed(&self) -> bool {
        self.session.read().is_none()
    }

    // ---- producer side ----

    /// Atomically raise the expected count by `n`.
    ///
    /// Must happen before the matching outcomes are consumed.
    pub fn declare_expected(&self, n: u64) {
        let total = self.expected.fetch_add(n, Ordering::AcqRel).saturating_add(n);
        if let Some(id) = self.session_id() {
            obs::emit_expected_declared(id, n, total);
        }
    }

    /// Hand one outcome to the consumer, waiting until it has been received.
    ///
    /// # Errors
    ///
    /// [`ValidatorError::Closed`] if the validator is closed, or is closed
    /// while this send is still parked.
    pub async fn record_outcome(
        &self,
        key: impl Into<String>,
        message: impl Into<String>,
        is_failure: bool,
    ) -> Result<()> {
        let tx = self.sender()?;
        tx.send(Outcome::new(key, message, is_failure)).await?;
        METRICS.inc_sent();
        Ok(())
    }

    /// Record a failure without blocking the caller.
    ///
    /// The returned handle resolves to the send's result; dropping it
    /// detaches the task. A send into a closed validator resolves to
    /// [`ValidatorError::Closed`] and is also logged at `warn`.
    ///
    /// See [`record_failure!`](crate::record_failure) for the formatting form.
    pub fn record_failure(
        &self,
        key: impl Into<String>,
        message: impl Into<String>,
    ) -> JoinHandle<Result<()>> {
        self.spawn_send(Outcome::failure(key, message))
    }

    /// Record a success without blocking the caller.
    pub fn record_success(&self, key: impl Into<String>) -> JoinHandle<Result<()>> {
        self.spawn_send(Outcome::success(key))
    }

    /// Record success if `condition` holds, otherwise a failure carrying `message`.
    pub fn check_condition(
        &self,
        key: impl Into<String>,
        condition: bool,
        message: impl Into<String>,
    ) -> JoinHandle<Result<()>> {
        if condition {
            self.record_success(key)
        } else {
            self.record_failure(key, message)
        }
    }

    /// Spawn a detached send on the channel generation that is current now.
    fn spawn_send(&self, outcome: Outcome) -> JoinHandle<Result<()>> {
        let target = self.session.read().as_ref().map(|s| (s.id, s.tx.clone()));
        tokio::spawn(detached_send(target, outcome))
    }

    fn sender(&self) -> Result<HandoffSender> {
        self.session
            .read()
            .as_ref()
            .map(|s| s.tx.clone())
            .ok_or(ValidatorError::Closed)
    }

    // ---- consumer side ----

    /// Receive exactly [`expected`](Self::expected) outcomes and group the
    /// failure messages by key.
    ///
    /// The count is read once, when the drain starts. Success outcomes are
    /// dropped; keys that only ever succeeded are absent from the result.
    /// Per-key message order is arrival order, which is only deterministic
    /// when the producers for that key are serialized.
    ///
    /// Blocks until the count is reached unless the config sets a
    /// `drain_timeout_ms`.
    ///
    /// # Errors
    ///
    /// - `Closed` — the validator was closed before or during the drain.
    /// - `ConsumerBusy` — another drain or key search is in progress.
    /// - `DrainTimedOut` — the configured timeout expired first. The
    ///   outcomes received so far are re-sent, as in
    ///   [`wait_for_key`](Self::wait_for_key), so a later drain sees them.
    pub async fn collect_failures(&self) -> Result<FailureMap> {
        self.drain(self.config.drain_timeout()).await
    }

    /// [`collect_failures`](Self::collect_failures) bounded by `limit`.
    pub async fn collect_failures_within(&self, limit: Duration) -> Result<FailureMap> {
        self.drain(Some(limit)).await
    }

    /// Drain, then close the validator whether or not the drain succeeded.
    pub async fn collect_failures_and_close(&self) -> Result<FailureMap> {
        let collected = self.collect_failures().await;
        self.close();
        collected
    }

    async fn drain(&self, limit: Option<Duration>) -> Result<FailureMap> {
        let (session_id, receiver) = self.receiver()?;
        let tx = self.sender()?;
        let expected = self.expected();
        let span = obs::drain_span(session_id, "collect");

        async move {
            let mut rx = receiver.try_lock().map_err(|_| ValidatorError::ConsumerBusy)?;
            let started = std::time::Instant::now();
            let deadline = limit.map(|d| Instant::now() + d);
            obs::emit_drain_started(session_id, expected);

            let mut pulled: Vec<Outcome> = Vec::new();
            let mut failure = None;
            while (pulled.len() as u64) < expected {
                match rx.recv_until(deadline).await {
                    Ok(outcome) => {
                        self.note_received(session_id, &outcome);
                        pulled.push(outcome);
                    }
                    Err(e) => {
                        failure = Some(e);
                        break;
                    }
                }
            }
            drop(rx);

            let received = pulled.len() as u64;
            if let Some(e) = failure {
                // A timed-out drain hands back what it took so a retry can
                // still reach the count.
                if e == RecvError::Elapsed {
                    restore(session_id, &tx, pulled);
                }
                return Err(recv_failure(e, received, expected));
            }

            let mut failures = FailureMap::new();
            for outcome in pulled {
                if classify_into(&mut failures, outcome) {
                    METRICS.inc_failures();
                }
            }

            obs::emit_drain_finished(
                session_id,
                received,
                failures.len(),
                started.elapsed().as_millis() as u64,
            );
            Ok(failures)
        }
        .instrument(span)
        .await
    }

    /// Wait for the first outcome recorded under `key` and return a copy,
    /// leaving every outcome in place for a later drain.
    ///
    /// Outcomes are pulled one by one into a buffer until `key` shows up or
    /// [`expected`](Self::expected) outcomes have been seen. Every buffered
    /// outcome, the match included, is then re-sent as a detached task in
    /// the order it was pulled. The re-sends race with any other producers:
    /// the channel is not guaranteed to be back in its prior state when this
    /// returns, only eventually.
    ///
    /// Returns `Ok(None)` when no outcome within the expected count matched.
    ///
    /// # Errors
    ///
    /// As [`collect_failures`](Self::collect_failures). On `DrainTimedOut`
    /// the already-pulled outcomes are still restored.
    pub async fn wait_for_key(&self, key: &str) -> Result<Option<Outcome>> {
        self.search(key, self.config.drain_timeout()).await
    }

    /// [`wait_for_key`](Self::wait_for_key) bounded by `limit`.
    pub async fn wait_for_key_within(
        &self,
        key: &str,
        limit: Duration,
    ) -> Result<Option<Outcome>> {
        self.search(key, Some(limit)).await
    }

    async fn search(&self, key: &str, limit: Option<Duration>) -> Result<Option<Outcome>> {
        let (session_id, receiver) = self.receiver()?;
        let tx = self.sender()?;
        let expected = self.expected();
        let span = obs::drain_span(session_id, "wait_for_key");

        async move {
            let mut rx = receiver.try_lock().map_err(|_| ValidatorError::ConsumerBusy)?;
            let deadline = limit.map(|d| Instant::now() + d);

            let mut pulled: Vec<Outcome> = Vec::new();
            let mut found = None;
            let mut failure = None;
            while (pulled.len() as u64) < expected {
                match rx.recv_until(deadline).await {
                    Ok(outcome) => {
                        self.note_received(session_id, &outcome);
                        let hit = outcome.key == key;
                        if hit {
                            found = Some(outcome.clone());
                        }
                        pulled.push(outcome);
                        if hit {
                            break;
                        }
                    }
                    Err(e) => {
                        failure = Some(recv_failure(e, pulled.len() as u64, expected));
                        break;
                    }
                }
            }
            drop(rx);

            obs::emit_key_probed(session_id, key, found.is_some(), pulled.len());
            restore(session_id, &tx, pulled);

            match failure {
                Some(err) => Err(err),
                None => Ok(found),
            }
        }
        .instrument(span)
        .await
    }

    fn receiver(&self) -> Result<(Uuid, Arc<Mutex<HandoffReceiver>>)> {
        self.session
            .read()
            .as_ref()
            .map(|s| (s.id, Arc::clone(&s.rx)))
            .ok_or(ValidatorError::Closed)
    }

    fn note_received(&self, session_id: Uuid, outcome: &Outcome) {
        METRICS.inc_received();
        if self.config.log_outcomes {
            obs::emit_outcome_received(session_id, &outcome.key, outcome.is_failure);
        }
    }

    // ---- lifecycle ----

    /// Close the channel and zero the expected count.
    ///
    /// Parked and future sends fail with [`ValidatorError::Closed`].
    /// Calling this on a closed validator does nothing.
    ///
    /// A drain or key search running at the time is woken and fails with
    /// `Closed`; outcomes it had already received are discarded.
    pub fn close(&self) {
        let taken = {
            let mut slot = self.session.write();
            self.expected.store(0, Ordering::Release);
            slot.take()
        };
        match taken {
            Some(session) => shut_down(session),
            None => tracing::debug!("close on an already closed validator"),
        }
    }

    /// Close and reopen in place with a fresh channel, a zero count and a
    /// new session id. Every holder of this validator sees the new state;
    /// the swap happens under one lock, so readers never observe a closed
    /// validator in between.
    ///
    /// Detached sends spawned before the reset target the old channel and
    /// fail rather than leak into the new session.
    pub fn reset(&self) {
        let fresh = Session::open();
        let id = fresh.id;
        let previous = {
            let mut slot = self.session.write();
            self.expected.store(0, Ordering::Release);
            slot.replace(fresh)
        };
        let previous_id = previous.as_ref().map(|s| s.id);
        if let Some(session) = previous {
            shut_down(session);
        }
        obs::emit_validator_reset(previous_id, id);
    }
}

/// Close a session that has already been detached from its validator.
fn shut_down(session: Session) {
    session.closer.close();
    // With no consumer attached, fail parked sends now rather than on the
    // next receive.
    if let Ok(mut rx) = session.rx.try_lock() {
        rx.close();
    }
    obs::emit_validator_closed(session.id);
}

/// Body of every detached send. Failures are logged and counted, then
/// returned through the task's handle.
async fn detached_send(target: Option<(Uuid, HandoffSender)>, outcome: Outcome) -> Result<()> {
    let Some((session_id, tx)) = target else {
        METRICS.inc_rejected();
        obs::emit_send_rejected(None, &outcome.key, &ValidatorError::Closed);
        return Err(ValidatorError::Closed);
    };
    let key = outcome.key.clone();
    match tx.send(outcome).await {
        Ok(()) => {
            METRICS.inc_sent();
            Ok(())
        }
        Err(err) => {
            METRICS.inc_rejected();
            obs::emit_send_rejected(Some(session_id), &key, &err);
            Err(err)
        }
    }
}

/// Re-queue pulled outcomes, one detached send each, in pulled order.
fn restore(session_id: Uuid, tx: &HandoffSender, pulled: Vec<Outcome>) {
    if pulled.is_empty() {
        return;
    }
    METRICS.add_restored(pulled.len() as u64);
    obs::emit_outcomes_restored(session_id, pulled.len());
    for outcome in pulled {
        tokio::spawn(detached_send(Some((session_id, tx.clone())), outcome));
    }
}

fn recv_failure(err: RecvError, received: u64, expected: u64) -> ValidatorError {
    match err {
        RecvError::Closed => ValidatorError::Closed,
        RecvError::Elapsed => ValidatorError::DrainTimedOut { received, expected },
    }
}
