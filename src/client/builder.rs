//! Builder for [`PipelinedClient`].

use std::time::Duration;

use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::{TcpStream, ToSocketAddrs},
};

use super::{ClientConfig, ClientError, PipelinedClient};

/// Builder for [`PipelinedClient`].
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use replyline::client::PipelinedClientBuilder;
///
/// let builder = PipelinedClientBuilder::new().response_timeout(Some(Duration::from_secs(10)));
/// let _ = builder;
/// ```
#[derive(Clone, Debug, Default)]
pub struct PipelinedClientBuilder {
    config: ClientConfig,
}

impl PipelinedClientBuilder {
    /// Create a builder with default settings.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Replace the whole configuration.
    #[must_use]
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Deadline for each wait; `None` waits indefinitely.
    #[must_use]
    pub fn response_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config = self.config.response_timeout(timeout);
        self
    }

    /// Longest reply line accepted.
    #[must_use]
    pub fn max_line_length(mut self, len: usize) -> Self {
        self.config = self.config.max_line_length(len);
        self
    }

    /// Set `TCP_NODELAY` on connections opened by [`connect`](Self::connect).
    #[must_use]
    pub fn nodelay(mut self, enabled: bool) -> Self {
        self.config = self.config.nodelay(enabled);
        self
    }

    /// Open a TCP connection and start the reply pump.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Connect`] if the connection or socket
    /// configuration fails.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use replyline::client::{ClientError, PipelinedClient};
    ///
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), ClientError> {
    /// let mut client = PipelinedClient::builder().connect("127.0.0.1:25").await?;
    /// let greeting = client.read_greeting().await?;
    /// assert!(greeting.is_positive_completion());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn connect<A: ToSocketAddrs>(
        self,
        addr: A,
    ) -> Result<PipelinedClient<TcpStream>, ClientError> {
        let stream = TcpStream::connect(addr).await.map_err(ClientError::Connect)?;
        stream
            .set_nodelay(self.config.nodelay_value())
            .map_err(ClientError::Connect)?;
        tracing::info!(peer = ?stream.peer_addr().ok(), "connected");
        Ok(self.connect_stream(stream))
    }

    /// Wrap an already-established stream and start the reply pump.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn connect_stream<T>(self, stream: T) -> PipelinedClient<T>
    where
        T: AsyncRead + AsyncWrite + Send + 'static,
    {
        PipelinedClient::start(stream, self.config)
    }
}

impl From<ClientConfig> for PipelinedClientBuilder {
    fn from(config: ClientConfig) -> Self { Self { config } }
}

