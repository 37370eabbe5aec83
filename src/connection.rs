//! Reader-side driver feeding decoded replies into a correlator.
//!
//! [`ReplyPump`] owns the inbound half of a connection. It polls a shutdown
//! token and a stream of decoded replies using a `tokio::select!` loop. The
//! `biased` keyword ensures shutdown wins over a ready reply. Every reply is
//! handed to [`ResponseCorrelator::on_reply`] in arrival order; the first
//! stream error, the end of the stream, or shutdown is handed to
//! [`ResponseCorrelator::on_fault`] and ends the pump.

use std::{fmt, sync::Arc};

use futures::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{
    correlator::{ReplyOutcome, ResponseCorrelator},
    error::TransportError,
    metrics,
};

/// Why a pump stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PumpOutcome {
    /// The reply stream ended.
    Disconnected,
    /// The reply stream yielded an error.
    Faulted,
    /// The shutdown token was cancelled.
    Shutdown,
}

/// Summary returned by [`ReplyPump::run`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PumpReport {
    /// Why the pump stopped.
    pub outcome: PumpOutcome,
    /// Replies read from the stream, including discarded ones.
    pub replies: usize,
    /// Replies dropped because no wait was pending.
    pub discarded: usize,
}

/// Drives a reply stream into a shared [`ResponseCorrelator`].
///
/// The fault type `E` must be constructible from [`TransportError`] so the
/// pump can report disconnects and shutdown, and from the stream's own error
/// type.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use futures::stream;
/// use replyline::{
///     Reply,
///     ResponseCorrelator,
///     TransportError,
///     codec::CodecError,
///     connection::{PumpOutcome, ReplyPump},
/// };
/// use tokio_util::sync::CancellationToken;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let correlator = Arc::new(ResponseCorrelator::<Reply, TransportError>::new());
/// let wait = correlator.begin_wait(1).expect("slot is free");
/// let replies = stream::iter(vec![Ok::<_, CodecError>(Reply::single(220, "ready"))]);
///
/// let report = ReplyPump::new(replies, Arc::clone(&correlator), CancellationToken::new())
///     .run()
///     .await;
///
/// assert_eq!(report.outcome, PumpOutcome::Disconnected);
/// assert_eq!(wait.await.expect("greeting")[0].code(), 220);
/// # }
/// ```
pub struct ReplyPump<S, R, E> {
    stream: S,
    correlator: Arc<ResponseCorrelator<R, E>>,
    shutdown: CancellationToken,
    replies: usize,
    discarded: usize,
}

impl<S, R, E, F> ReplyPump<S, R, E>
where
    S: Stream<Item = Result<R, F>> + Unpin,
    F: Into<E>,
    E: From<TransportError> + fmt::Display,
{
    /// Create a pump over `stream` delivering into `correlator`.
    #[must_use]
    pub fn new(
        stream: S,
        correlator: Arc<ResponseCorrelator<R, E>>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            stream,
            correlator,
            shutdown,
            replies: 0,
            discarded: 0,
        }
    }

    /// Drive the stream until it ends, fails, or shutdown is requested.
    ///
    /// A wait still pending when the pump stops is failed with the fault that
    /// stopped it. The shutdown token is cancelled before that final fault is
    /// delivered, so a caller that registers a wait and then finds the token
    /// cancelled knows nobody will resolve the wait but itself.
    pub async fn run(mut self) -> PumpReport {
        let outcome = loop {
            tokio::select! {
                biased;

                () = self.shutdown.cancelled() => {
                    self.fault(TransportError::Disconnected.into(), PumpOutcome::Shutdown);
                    break PumpOutcome::Shutdown;
                }

                item = self.stream.next() => match item {
                    Some(Ok(reply)) => self.deliver(reply),
                    Some(Err(error)) => {
                        self.shutdown.cancel();
                        self.fault(error.into(), PumpOutcome::Faulted);
                        break PumpOutcome::Faulted;
                    }
                    None => {
                        self.shutdown.cancel();
                        self.fault(TransportError::Disconnected.into(), PumpOutcome::Disconnected);
                        break PumpOutcome::Disconnected;
                    }
                },
            }
        };
        debug!(
            ?outcome,
            replies = self.replies,
            discarded = self.discarded,
            "reply pump stopped"
        );
        PumpReport {
            outcome,
            replies: self.replies,
            discarded: self.discarded,
        }
    }

    fn deliver(&mut self, reply: R) {
        self.replies += 1;
        if self.correlator.on_reply(reply) == ReplyOutcome::Discarded {
            self.discarded += 1;
        }
    }

    fn fault(&self, error: E, outcome: PumpOutcome) {
        let Some(unclaimed) = self.correlator.on_fault(error) else {
            return;
        };
        if outcome == PumpOutcome::Faulted {
            log::warn!("connection fault with no pending wait: {unclaimed}");
            metrics::inc_faults_unclaimed();
        } else {
            debug!(?outcome, "connection closed with no pending wait");
        }
    }
}
