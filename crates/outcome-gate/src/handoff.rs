//! Zero-capacity handoff channel between checks and the consumer.
//!
//! Tokio has no rendezvous channel, so each queued record carries a
//! `oneshot` acknowledgement. A send resolves only after the consumer has
//! taken the record off the queue, which gives the same observable
//! behaviour as a channel with no buffer: senders stay parked until a
//! matching receive happens.
//!
//! Records from one sender arrive in the order they were sent. There is no
//! ordering across senders.
//!
//! A [`HandoffCloser`] shuts the channel down from outside, even while a
//! consumer is blocked in [`HandoffReceiver::recv`] holding the receiver.

use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;

use crate::error::ValidatorError;
use crate::outcome::Outcome;

struct Envelope {
    outcome: Outcome,
    ack: oneshot::Sender<()>,
}

/// Why a receive did not produce an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RecvError {
    /// Every sender is gone and the queue is empty.
    Closed,
    /// The deadline passed first.
    Elapsed,
}

/// Create a connected sender/receiver pair and the closer for it.
pub(crate) fn rendezvous() -> (HandoffSender, HandoffReceiver, HandoffCloser) {
    let (tx, rx) = mpsc::unbounded_channel();
    let (shutdown_tx, shutdown) = watch::channel(false);
    (
        HandoffSender { tx },
        HandoffReceiver { rx, shutdown },
        HandoffCloser { shutdown: shutdown_tx },
    )
}

/// Producer half. Cheap to clone; every detached send owns one.
#[derive(Clone)]
pub(crate) struct HandoffSender {
    tx: mpsc::UnboundedSender<Envelope>,
}

impl HandoffSender {
    /// Hand `outcome` to the consumer and wait until it has been received.
    ///
    /// Fails with [`ValidatorError::Closed`] if the receiver is closed before
    /// or while this send is parked. A send whose future is dropped after
    /// queueing is still delivered.
    pub(crate) async fn send(&self, outcome: Outcome) -> Result<(), ValidatorError> {
        let (ack, acked) = oneshot::channel();
        self.tx
            .send(Envelope { outcome, ack })
            .map_err(|_| ValidatorError::Closed)?;
        acked.await.map_err(|_| ValidatorError::Closed)
    }
}

/// Consumer half. Only one task receives at a time.
pub(crate) struct HandoffReceiver {
    rx: mpsc::UnboundedReceiver<Envelope>,
    shutdown: watch::Receiver<bool>,
}

impl HandoffReceiver {
    /// Receive the next outcome and release its sender.
    ///
    /// Returns `None` once every sender is gone or the closer has fired. In
    /// the latter case the receiver closes itself, failing parked sends.
    pub(crate) async fn recv(&mut self) -> Option<Outcome> {
        let next = tokio::select! {
            biased;
            _ = self.shutdown.wait_for(|closed| *closed) => None,
            envelope = self.rx.recv() => envelope,
        };
        let Some(envelope) = next else {
            self.close();
            return None;
        };
        // The sender may have stopped waiting; the record still counts.
        let _ = envelope.ack.send(());
        Some(envelope.outcome)
    }

    /// Like [`recv`](Self::recv) but gives up at `deadline`, if one is set.
    ///
    /// Cancel-safe: an elapsed deadline never loses a queued record.
    pub(crate) async fn recv_until(
        &mut self,
        deadline: Option<Instant>,
    ) -> Result<Outcome, RecvError> {
        let next = match deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, self.recv())
                .await
                .map_err(|_| RecvError::Elapsed)?,
            None => self.recv().await,
        };
        next.ok_or(RecvError::Closed)
    }

    /// Refuse new sends and fail every parked one.
    pub(crate) fn close(&mut self) {
        self.rx.close();
        // Dropping the queued envelopes drops their acks, waking the senders.
        while self.rx.try_recv().is_ok() {}
    }
}

/// Shuts a channel down without access to its receiver.
pub(crate) struct HandoffCloser {
    shutdown: watch::Sender<bool>,
}

impl HandoffCloser {
    /// Wake the consumer, if any, and make every later receive fail.
    pub(crate) fn close(&self) {
        self.shutdown.send_replace(true);
    }
}
