//! Count-and-order correlation of replies to the wait that requested them.
//!
//! A [`ResponseCorrelator`] holds at most one pending wait. The command layer
//! registers a wait with [`begin_wait`](ResponseCorrelator::begin_wait) before
//! or while it writes a command, and the connection layer feeds every decoded
//! reply through [`on_reply`](ResponseCorrelator::on_reply) and every terminal
//! fault through [`on_fault`](ResponseCorrelator::on_fault), in protocol
//! order. Because the protocol is strictly ordered there are no request
//! identifiers: the next `expected` replies belong to the pending wait.
//!
//! The slot is guarded by a mutex held only for the state transition. The
//! slot is always emptied before the wait's [`ResponseFuture`] is resolved, so
//! code running on completion can register the next wait straight away.

use std::{fmt, sync::PoisonError};
#[cfg(not(loom))]
use std::sync::{Mutex, MutexGuard};

#[cfg(loom)]
use loom::sync::{Mutex, MutexGuard};
use tokio::sync::oneshot;
use tracing::{debug, trace, warn};

use crate::{
    error::{CorrelationError, WaitError},
    metrics::{self, WaitOutcome},
    response_future::{ResponseFuture, WaitResult},
};

// Caps the up-front allocation; larger waits grow as replies arrive.
const INITIAL_CAPACITY_LIMIT: usize = 16;

struct PendingWait<R, E> {
    expected: usize,
    collected: Vec<R>,
    label: Option<String>,
    tx: oneshot::Sender<WaitResult<R, E>>,
}

impl<R, E> PendingWait<R, E> {
    fn snapshot(&self) -> PendingSnapshot {
        PendingSnapshot {
            expected: self.expected,
            collected: self.collected.len(),
            label: self.label.clone(),
        }
    }

    fn resolve(self, result: WaitResult<R, E>) {
        if self.tx.send(result).is_err() {
            debug!(
                expected = self.expected,
                "wait resolved after its future was dropped"
            );
        }
    }
}

/// Point-in-time view of the pending wait.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingSnapshot {
    /// Replies the wait was registered for.
    pub expected: usize,
    /// Replies collected so far.
    pub collected: usize,
    /// Label given at registration, if any.
    pub label: Option<String>,
}

/// What [`ResponseCorrelator::on_reply`] did with a reply.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReplyOutcome {
    /// No wait was pending; the reply was dropped.
    Discarded,
    /// The reply was appended and the wait needs more.
    Collected {
        /// Replies collected so far, including this one.
        collected: usize,
        /// Replies the wait was registered for.
        expected: usize,
    },
    /// The reply completed the wait and its future was resolved.
    Completed,
}

/// Single-slot correlator bridging connection events to caller futures.
///
/// `R` is the decoded reply unit and `E` the fault type the connection layer
/// reports. Share it between the reader task and the command issuer behind an
/// [`Arc`](std::sync::Arc).
///
/// # Examples
///
/// ```
/// use std::io;
///
/// use replyline::{CorrelationError, ResponseCorrelator, WaitError};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let correlator: ResponseCorrelator<u16, io::Error> = ResponseCorrelator::new();
///
/// let first = correlator.begin_wait(1).expect("slot is free");
/// assert!(matches!(
///     correlator.begin_wait(1),
///     Err(WaitError::AlreadyPending { .. })
/// ));
///
/// correlator.on_reply(250);
/// assert_eq!(first.await.expect("reply"), vec![250]);
///
/// let second = correlator.begin_wait(3).expect("slot was released");
/// correlator.on_reply(354);
/// correlator.on_fault(io::Error::from(io::ErrorKind::ConnectionReset));
/// assert!(matches!(second.await, Err(CorrelationError::Fault(_))));
/// # }
/// ```
pub struct ResponseCorrelator<R, E> {
    slot: Mutex<Option<PendingWait<R, E>>>,
}

impl<R, E> Default for ResponseCorrelator<R, E> {
    fn default() -> Self { Self::new() }
}

impl<R, E> ResponseCorrelator<R, E> {
    /// Create a correlator with an empty slot.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    fn slot(&self) -> MutexGuard<'_, Option<PendingWait<R, E>>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a wait for exactly `expected` replies.
    ///
    /// No I/O happens here; the returned future is resolved by later calls to
    /// [`on_reply`](Self::on_reply) or [`on_fault`](Self::on_fault).
    ///
    /// # Errors
    ///
    /// Returns [`WaitError::AlreadyPending`] if a wait already occupies the
    /// slot, leaving that wait untouched, and [`WaitError::ZeroReplies`] if
    /// `expected` is zero.
    pub fn begin_wait(&self, expected: usize) -> Result<ResponseFuture<R, E>, WaitError> {
        self.install(expected, None)
    }

    /// Register a wait carrying a human-readable label.
    ///
    /// The label shows up in [`WaitError::AlreadyPending`] when another
    /// registration collides with this one, and in [`pending`](Self::pending).
    ///
    /// # Errors
    ///
    /// See [`begin_wait`](Self::begin_wait).
    pub fn begin_wait_labelled(
        &self,
        expected: usize,
        label: impl Into<String>,
    ) -> Result<ResponseFuture<R, E>, WaitError> {
        self.install(expected, Some(label.into()))
    }

    fn install(
        &self,
        expected: usize,
        label: Option<String>,
    ) -> Result<ResponseFuture<R, E>, WaitError> {
        if expected == 0 {
            return Err(WaitError::ZeroReplies);
        }
        let mut slot = self.slot();
        if let Some(pending) = slot.as_ref() {
            let snapshot = pending.snapshot();
            drop(slot);
            warn!(
                pending.expected = snapshot.expected,
                pending.collected = snapshot.collected,
                attempted = expected,
                "rejected overlapping wait"
            );
            metrics::inc_waits(WaitOutcome::Rejected);
            return Err(WaitError::AlreadyPending {
                expected: snapshot.expected,
                collected: snapshot.collected,
                label: snapshot.label,
            });
        }
        let (tx, rx) = oneshot::channel();
        *slot = Some(PendingWait {
            expected,
            collected: Vec::with_capacity(expected.min(INITIAL_CAPACITY_LIMIT)),
            label,
            tx,
        });
        drop(slot);
        debug!(expected, "wait registered");
        Ok(ResponseFuture::new(rx, expected))
    }

    /// Deliver one decoded reply, in arrival order.
    ///
    /// With no wait pending the reply is discarded. Otherwise it is appended;
    /// the reply that fills the wait empties the slot and then resolves the
    /// future with every collected reply.
    pub fn on_reply(&self, reply: R) -> ReplyOutcome {
        let mut slot = self.slot();
        let (collected, expected) = match slot.as_mut() {
            Some(pending) => {
                pending.collected.push(reply);
                (pending.collected.len(), pending.expected)
            }
            None => {
                drop(slot);
                trace!("reply discarded: no wait pending");
                metrics::inc_replies_discarded();
                return ReplyOutcome::Discarded;
            }
        };
        if collected < expected {
            drop(slot);
            trace!(collected, expected, "reply collected");
            return ReplyOutcome::Collected {
                collected,
                expected,
            };
        }
        let done = slot.take();
        drop(slot);
        if let Some(mut done) = done {
            debug!(expected, "wait completed");
            metrics::inc_waits(WaitOutcome::Completed);
            let replies = std::mem::take(&mut done.collected);
            done.resolve(Ok(replies));
        }
        ReplyOutcome::Completed
    }

    /// Fail the pending wait with a connection fault.
    ///
    /// Replies collected so far are discarded. Returns the fault back to the
    /// caller when no wait was pending, so the connection layer can report it
    /// elsewhere.
    pub fn on_fault(&self, error: E) -> Option<E> {
        let taken = self.slot().take();
        let Some(pending) = taken else {
            trace!("fault ignored: no wait pending");
            return Some(error);
        };
        debug!(
            expected = pending.expected,
            collected = pending.collected.len(),
            "wait failed"
        );
        metrics::inc_waits(WaitOutcome::Failed);
        pending.resolve(Err(CorrelationError::Fault(error)));
        None
    }

    /// Returns `true` while a wait occupies the slot.
    #[must_use]
    pub fn is_pending(&self) -> bool { self.slot().is_some() }

    /// Snapshot of the pending wait, if any.
    #[must_use]
    pub fn pending(&self) -> Option<PendingSnapshot> {
        self.slot().as_ref().map(PendingWait::snapshot)
    }
}

impl<R, E> fmt::Debug for ResponseCorrelator<R, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseCorrelator")
            .field("pending", &self.pending())
            .finish()
    }
}
