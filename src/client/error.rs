//! Error types for pipelined client operations.

use std::io;

use crate::error::{CorrelationError, TransportError, WaitError};

/// Errors emitted by [`PipelinedClient`](super::PipelinedClient).
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Opening the connection failed.
    #[error("failed to connect: {0}")]
    Connect(#[source] io::Error),
    /// A command could not be written outside of a wait.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// The client attempted to overlap waits.
    #[error(transparent)]
    Wait(#[from] WaitError),
    /// The connection faulted before the expected replies arrived.
    #[error(transparent)]
    Correlation(#[from] CorrelationError<TransportError>),
}

impl ClientError {
    /// The transport fault behind this error, if there is one.
    #[must_use]
    pub fn transport(&self) -> Option<&TransportError> {
        match self {
            Self::Transport(error) => Some(error),
            Self::Correlation(error) => error.fault(),
            Self::Connect(_) | Self::Wait(_) => None,
        }
    }

    /// Returns `true` if the wait failed because no reply arrived in time.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self.transport(), Some(TransportError::Timeout { .. }))
    }
}
