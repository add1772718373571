//! Global atomic counters for validator traffic.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event (e.g. after a drain).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Lightweight atomic counters — no allocations, no locking.
pub struct Metrics {
    outcomes_sent: AtomicU64,
    outcomes_received: AtomicU64,
    failures_collected: AtomicU64,
    outcomes_restored: AtomicU64,
    sends_rejected: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            outcomes_sent: AtomicU64::new(0),
            outcomes_received: AtomicU64::new(0),
            failures_collected: AtomicU64::new(0),
            outcomes_restored: AtomicU64::new(0),
            sends_rejected: AtomicU64::new(0),
        }
    }

    /// A producer's handoff completed.
    pub fn inc_sent(&self) {
        self.outcomes_sent.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "outcomes_sent", "counter incremented");
    }

    /// The consumer took an outcome off the channel.
    pub fn inc_received(&self) {
        self.outcomes_received.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "outcomes_received", "counter incremented");
    }

    /// A drain recorded a failure message.
    pub fn inc_failures(&self) {
        self.failures_collected.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "failures_collected", "counter incremented");
    }

    /// A key search re-queued `n` outcomes.
    pub fn add_restored(&self, n: u64) {
        self.outcomes_restored.fetch_add(n, Ordering::Relaxed);
        tracing::trace!(metric = "outcomes_restored", n, "counter incremented");
    }

    /// A send hit a closed validator.
    pub fn inc_rejected(&self) {
        self.sends_rejected.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "sends_rejected", "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            outcomes_sent = self.outcomes_sent(),
            outcomes_received = self.outcomes_received(),
            failures_collected = self.failures_collected(),
            outcomes_restored = self.outcomes_restored(),
            sends_rejected = self.sends_rejected(),
        );
    }

    pub fn outcomes_sent(&self) -> u64 {
        self.outcomes_sent.load(Ordering::Relaxed)
    }

    pub fn outcomes_received(&self) -> u64 {
        self.outcomes_received.load(Ordering::Relaxed)
    }

    pub fn failures_collected(&self) -> u64 {
        self.failures_collected.load(Ordering::Relaxed)
    }

    pub fn outcomes_restored(&self) -> u64 {
        self.outcomes_restored.load(Ordering::Relaxed)
    }

    pub fn sends_rejected(&self) -> u64 {
        self.sends_rejected.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.outcomes_sent.store(0, Ordering::Relaxed);
        self.outcomes_received.store(0, Ordering::Relaxed);
        self.failures_collected.store(0, Ordering::Relaxed);
        self.outcomes_restored.store(0, Ordering::Relaxed);
        self.sends_rejected.store(0, Ordering::Relaxed);
    }
}
