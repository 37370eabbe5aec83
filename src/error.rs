//! Error types for response correlation.
//!
//! Two kinds of failure exist. [`WaitError`] is returned synchronously by
//! [`ResponseCorrelator::begin_wait`](crate::ResponseCorrelator::begin_wait)
//! when the caller breaks the one-wait-at-a-time contract. [`CorrelationError`]
//! is delivered asynchronously through a
//! [`ResponseFuture`](crate::ResponseFuture) when the connection faults while
//! the wait is pending. [`TransportError`] is the fault type the bundled
//! reply pump and client feed into the correlator.

use std::{io, time::Duration};

use thiserror::Error;

use crate::codec::CodecError;

/// Caller contract violations reported by `begin_wait`.
#[non_exhaustive]
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum WaitError {
    /// A wait is already outstanding on this connection.
    #[error("cannot wait for a response while one is already pending{}", label_suffix(.label.as_deref()))]
    AlreadyPending {
        /// Reply count the outstanding wait expects.
        expected: usize,
        /// Replies the outstanding wait has collected so far.
        collected: usize,
        /// Label of the outstanding wait, if it was given one.
        label: Option<String>,
    },
    /// A wait must expect at least one reply.
    #[error("cannot wait for zero replies")]
    ZeroReplies,
}

fn label_suffix(label: Option<&str>) -> String {
    label.map(|l| format!(" ({l})")).unwrap_or_default()
}

/// Failure delivered through a [`ResponseFuture`](crate::ResponseFuture).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CorrelationError<E> {
    /// The connection faulted while the wait was pending.
    #[error("connection fault while awaiting replies: {0}")]
    Fault(#[source] E),
    /// The correlator was dropped with the wait still pending.
    #[error("correlator dropped before the expected replies arrived")]
    Abandoned,
}

impl<E> CorrelationError<E> {
    /// Return the wrapped fault, if this failure carries one.
    #[must_use]
    pub fn fault(&self) -> Option<&E> {
        match self {
            Self::Fault(error) => Some(error),
            Self::Abandoned => None,
        }
    }

    /// Consume the failure and return the wrapped fault, if any.
    #[must_use]
    pub fn into_fault(self) -> Option<E> {
        match self {
            Self::Fault(error) => Some(error),
            Self::Abandoned => None,
        }
    }
}

/// Terminal connection faults fed into a correlator by the connection layer.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum TransportError {
    /// Reading or writing the socket failed.
    #[error("transport error: {0}")]
    Io(#[from] io::Error),
    /// The reply stream could not be decoded.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
    /// The peer closed the connection, or the client shut it down.
    #[error("connection closed")]
    Disconnected,
    /// The expected replies did not arrive in time.
    #[error("no reply within {after:?}{}", label_suffix(.label.as_deref()))]
    Timeout {
        /// Configured response timeout.
        after: Duration,
        /// Label of the wait that timed out, if any.
        label: Option<String>,
    },
}

impl TransportError {
    /// Returns `true` for [`TransportError::Disconnected`].
    #[must_use]
    pub fn is_disconnect(&self) -> bool { matches!(self, Self::Disconnected) }
}
