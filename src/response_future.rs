//! Caller-side handle for an outstanding wait.
//!
//! [`ResponseFuture`] wraps the receiving half of a one-shot channel. It
//! resolves exactly once: to every collected reply, in arrival order, or to a
//! [`CorrelationError`]. Partial collections are never observable.

use std::{
    fmt,
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use tokio::sync::oneshot;

use crate::error::CorrelationError;

pub(crate) type WaitResult<R, E> = Result<Vec<R>, CorrelationError<E>>;

/// Future resolved by a [`ResponseCorrelator`](crate::ResponseCorrelator)
/// once the expected replies arrive or the connection faults.
///
/// The future can be awaited, or inspected without blocking through
/// [`is_done`](Self::is_done) and [`try_take`](Self::try_take).
///
/// # Examples
///
/// ```
/// use replyline::ResponseCorrelator;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let correlator: ResponseCorrelator<&str, std::io::Error> = ResponseCorrelator::new();
/// let mut future = correlator.begin_wait(2).expect("slot is free");
///
/// correlator.on_reply("250-first");
/// assert!(!future.is_done());
///
/// correlator.on_reply("250 second");
/// assert!(future.is_done());
/// assert_eq!(future.await.expect("replies"), vec!["250-first", "250 second"]);
/// # }
/// ```
#[must_use = "a wait that is never observed still occupies the slot until it resolves"]
pub struct ResponseFuture<R, E> {
    rx: oneshot::Receiver<WaitResult<R, E>>,
    ready: Option<WaitResult<R, E>>,
    received: bool,
    expected: usize,
}

impl<R, E> ResponseFuture<R, E> {
    pub(crate) fn new(rx: oneshot::Receiver<WaitResult<R, E>>, expected: usize) -> Self {
        Self {
            rx,
            ready: None,
            received: false,
            expected,
        }
    }

    /// Number of replies this wait was registered for.
    #[must_use]
    pub fn expected(&self) -> usize { self.expected }

    /// Returns `true` once the wait has resolved, successfully or not.
    pub fn is_done(&mut self) -> bool { self.poll_ready().is_some() }

    /// Returns `true` if the wait resolved with a failure.
    pub fn is_failed(&mut self) -> bool { matches!(self.poll_ready(), Some(Err(_))) }

    /// Take the outcome if the wait has resolved, leaving the future empty.
    ///
    /// Returns `None` while the wait is still pending. After the outcome has
    /// been taken, awaiting the future yields [`CorrelationError::Abandoned`].
    pub fn try_take(&mut self) -> Option<WaitResult<R, E>> {
        self.poll_ready();
        self.ready.take()
    }

    fn poll_ready(&mut self) -> Option<&WaitResult<R, E>> {
        if self.ready.is_none() && !self.received {
            let outcome = match self.rx.try_recv() {
                Ok(result) => result,
                Err(oneshot::error::TryRecvError::Empty) => return None,
                Err(oneshot::error::TryRecvError::Closed) => Err(CorrelationError::Abandoned),
            };
            self.received = true;
            self.ready = Some(outcome);
        }
        self.ready.as_ref()
    }
}

// No field is structurally pinned.
impl<R, E> Unpin for ResponseFuture<R, E> {}

impl<R, E> Future for ResponseFuture<R, E> {
    type Output = WaitResult<R, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        if let Some(result) = this.ready.take() {
            return Poll::Ready(result);
        }
        if this.received {
            return Poll::Ready(Err(CorrelationError::Abandoned));
        }
        match Pin::new(&mut this.rx).poll(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(outcome) => {
                this.received = true;
                Poll::Ready(outcome.unwrap_or(Err(CorrelationError::Abandoned)))
            }
        }
    }
}

impl<R, E> fmt::Debug for ResponseFuture<R, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseFuture")
            .field("expected", &self.expected)
            .field("ready", &self.ready.is_some())
            .finish_non_exhaustive()
    }
}
