//! Pipelined client runtime.

use std::{fmt, sync::Arc, time::Duration};

use futures::SinkExt;
use tokio::{
    io::{AsyncRead, AsyncWrite, ReadHalf, WriteHalf},
    net::TcpStream,
    task::JoinHandle,
};
use tokio_util::{
    codec::{FramedRead, FramedWrite},
    sync::{CancellationToken, DropGuard},
};
use tracing::{Instrument, debug_span};

use super::{ClientConfig, ClientError, PipelinedClientBuilder};
use crate::{
    codec::{CommandCodec, ReplyCodec, validate_command},
    connection::{PumpReport, ReplyPump},
    correlator::ResponseCorrelator,
    error::TransportError,
    reply::Reply,
    response_future::ResponseFuture,
};

/// Correlator type shared between a client and its reply pump.
pub type ReplyCorrelator = ResponseCorrelator<Reply, TransportError>;

/// Client issuing commands over one ordered connection.
///
/// Replies are read by a background [`ReplyPump`] task and matched to the
/// outstanding wait by count and order. Each batch registers its wait
/// *before* the commands are written, so replies racing ahead of the caller
/// are never lost.
///
/// # Examples
///
/// ```no_run
/// use replyline::client::{ClientError, PipelinedClient};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), ClientError> {
/// let mut client = PipelinedClient::builder().connect("127.0.0.1:25").await?;
/// client.read_greeting().await?;
/// client.command("EHLO client.example.com").await?;
/// let replies = client
///     .pipeline(
///         &["MAIL FROM:<a@example.com>", "RCPT TO:<b@example.com>", "DATA"],
///         3,
///     )
///     .await?;
/// assert_eq!(replies.len(), 3);
/// # Ok(())
/// # }
/// ```
pub struct PipelinedClient<T = TcpStream> {
    writer: FramedWrite<WriteHalf<T>, CommandCodec>,
    correlator: Arc<ReplyCorrelator>,
    config: ClientConfig,
    closed: CancellationToken,
    pump: JoinHandle<PumpReport>,
    _guard: DropGuard,
}

impl<T> fmt::Debug for PipelinedClient<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelinedClient")
            .field("config", &self.config)
            .field("correlator", &self.correlator)
            .field("closed", &self.closed.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl PipelinedClient<TcpStream> {
    /// Start building a new client.
    #[must_use]
    pub fn builder() -> PipelinedClientBuilder { PipelinedClientBuilder::new() }
}

impl<T> PipelinedClient<T>
where
    T: AsyncRead + AsyncWrite + Send + 'static,
{
    pub(crate) fn start(stream: T, config: ClientConfig) -> Self {
        let (read, write) = tokio::io::split(stream);
        let correlator = Arc::new(ReplyCorrelator::new());
        let closed = CancellationToken::new();
        let replies: FramedRead<ReadHalf<T>, ReplyCodec> =
            FramedRead::new(read, ReplyCodec::new(config.max_line_length_value()));
        let pump = tokio::spawn(
            ReplyPump::new(replies, Arc::clone(&correlator), closed.clone())
                .run()
                .instrument(debug_span!("reply_pump")),
        );
        Self {
            writer: FramedWrite::new(write, CommandCodec),
            correlator,
            config,
            _guard: closed.clone().drop_guard(),
            closed,
            pump,
        }
    }
}

impl<T> PipelinedClient<T>
where
    T: AsyncRead + AsyncWrite,
{
    /// Correlator shared with the reply pump.
    ///
    /// Waits registered here directly compete for the same slot as the
    /// client's own methods.
    #[must_use]
    pub fn correlator(&self) -> &Arc<ReplyCorrelator> { &self.correlator }

    /// Client configuration.
    #[must_use]
    pub fn config(&self) -> &ClientConfig { &self.config }

    /// Returns `true` once the reply pump has stopped.
    #[must_use]
    pub fn is_closed(&self) -> bool { self.closed.is_cancelled() }

    /// Wait for the server greeting without sending anything.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if a wait is already pending, or the connection
    /// faults or times out before the greeting arrives.
    pub async fn read_greeting(&mut self) -> Result<Reply, ClientError> {
        let mut replies = self.expect_replies_labelled(1, "greeting").await?;
        Ok(replies.remove(0))
    }

    /// Wait for `expected` replies without sending anything.
    ///
    /// # Errors
    ///
    /// See [`read_greeting`](Self::read_greeting).
    pub async fn expect_replies(&mut self, expected: usize) -> Result<Vec<Reply>, ClientError> {
        self.expect_replies_labelled(expected, "unsolicited replies")
            .await
    }

    async fn expect_replies_labelled(
        &mut self,
        expected: usize,
        label: &str,
    ) -> Result<Vec<Reply>, ClientError> {
        let wait = self.register(expected, label)?;
        self.finish(wait, label).await
    }

    /// Write one command without waiting for its reply.
    ///
    /// Any reply the command produces is discarded unless a wait is
    /// registered before it arrives.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Transport`] if the command cannot be encoded or
    /// written.
    pub async fn send(&mut self, command: &str) -> Result<(), ClientError> {
        let sent = self.writer.send(command).await;
        if sent.is_err() {
            self.writer.write_buffer_mut().clear();
        }
        sent.map_err(|e| ClientError::Transport(e.into()))
    }

    /// Send one command and wait for its single reply.
    ///
    /// # Errors
    ///
    /// See [`pipeline`](Self::pipeline).
    pub async fn command(&mut self, command: &str) -> Result<Reply, ClientError> {
        let mut replies = self.pipeline(&[command], 1).await?;
        Ok(replies.remove(0))
    }

    /// Write `commands` back to back and wait for `expected` replies.
    ///
    /// Every command is validated before anything is registered or queued,
    /// so a batch rejected for an embedded line break leaves the connection
    /// untouched. The wait is registered before the first command is
    /// written. A write failure or an expired response timeout is fed to the
    /// correlator as a fault, and any commands still buffered are dropped, so
    /// the slot is always released when this returns. Replies that
    /// arrive after a timeout are not matched to anything sensible; treat the
    /// connection as unusable once this returns a timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Transport`] if a command contains a line break,
    /// [`ClientError::Wait`] if another wait is pending, and
    /// [`ClientError::Correlation`] if the connection faults, a command
    /// cannot be written, or the replies do not arrive in time.
    pub async fn pipeline<C>(
        &mut self,
        commands: &[C],
        expected: usize,
    ) -> Result<Vec<Reply>, ClientError>
    where
        C: AsRef<str>,
    {
        let label = commands
            .iter()
            .map(|command| AsRef::<str>::as_ref(command))
            .collect::<Vec<&str>>()
            .join(", ");
        let span = debug_span!("pipeline", commands = commands.len(), expected);
        async {
            for command in commands {
                validate_command(AsRef::<str>::as_ref(command))
                    .map_err(|e| TransportError::Codec(e.into()))?;
            }
            let wait = self.register(expected, &label)?;
            if let Err(error) = self.write_all(commands).await {
                self.writer.write_buffer_mut().clear();
                self.fault(error);
            }
            self.finish(wait, &label).await
        }
        .instrument(span)
        .await
    }

    async fn write_all<C: AsRef<str>>(&mut self, commands: &[C]) -> Result<(), TransportError> {
        for command in commands {
            self.writer.feed(AsRef::<str>::as_ref(command)).await?;
        }
        SinkExt::<&str>::flush(&mut self.writer).await?;
        Ok(())
    }

    fn register(
        &self,
        expected: usize,
        label: &str,
    ) -> Result<ResponseFuture<Reply, TransportError>, ClientError> {
        let wait = self.correlator.begin_wait_labelled(expected, label)?;
        // The pump cancels `closed` before its final fault; a wait registered
        // after that fault would never resolve.
        if self.closed.is_cancelled() {
            self.fault(TransportError::Disconnected);
        }
        Ok(wait)
    }

    fn fault(&self, error: TransportError) {
        if let Some(unclaimed) = self.correlator.on_fault(error) {
            tracing::debug!(error = %unclaimed, "fault raced a resolved wait");
        }
    }

    async fn finish(
        &self,
        mut wait: ResponseFuture<Reply, TransportError>,
        label: &str,
    ) -> Result<Vec<Reply>, ClientError> {
        let Some(after) = self.config.response_timeout_value() else {
            return Ok(wait.await?);
        };
        match tokio::time::timeout(after, &mut wait).await {
            Ok(result) => Ok(result?),
            Err(_) => {
                self.fault(timeout(after, label));
                Ok(wait.await?)
            }
        }
    }

    /// Flush and shut down the write half, stop the reply pump, and return
    /// its report.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Transport`] if the writer cannot be shut down
    /// cleanly. The pump is stopped regardless.
    pub async fn close(mut self) -> Result<PumpReport, ClientError> {
        let closed = SinkExt::<&str>::close(&mut self.writer).await;
        self.closed.cancel();
        let report = (&mut self.pump)
            .await
            .map_err(|e| ClientError::Transport(TransportError::Io(e.into())))?;
        closed.map_err(|e| ClientError::Transport(e.into()))?;
        Ok(report)
    }
}

fn timeout(after: Duration, label: &str) -> TransportError {
    TransportError::Timeout {
        after,
        label: Some(label.to_owned()),
    }
}
