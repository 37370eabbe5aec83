//! Client configuration.

use std::time::Duration;

use crate::codec::{DEFAULT_LINE_LENGTH, clamp_line_length};

/// Default time allowed for the replies to a pipelined batch.
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Settings applied by [`PipelinedClientBuilder`](super::PipelinedClientBuilder).
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use replyline::client::ClientConfig;
///
/// let config = ClientConfig::default()
///     .response_timeout(Some(Duration::from_secs(30)))
///     .max_line_length(1000);
/// assert_eq!(config.response_timeout_value(), Some(Duration::from_secs(30)));
/// assert_eq!(config.max_line_length_value(), 1000);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    response_timeout: Option<Duration>,
    max_line_length: usize,
    nodelay: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            response_timeout: Some(DEFAULT_RESPONSE_TIMEOUT),
            max_line_length: DEFAULT_LINE_LENGTH,
            nodelay: true,
        }
    }
}

impl ClientConfig {
    /// Deadline for each wait; `None` waits indefinitely.
    #[must_use]
    pub fn response_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.response_timeout = timeout;
        self
    }

    /// Longest reply line accepted, clamped to the codec limits.
    #[must_use]
    pub fn max_line_length(mut self, len: usize) -> Self {
        self.max_line_length = clamp_line_length(len);
        self
    }

    /// Set `TCP_NODELAY` on connections opened by the builder.
    #[must_use]
    pub fn nodelay(mut self, enabled: bool) -> Self {
        self.nodelay = enabled;
        self
    }

    /// Configured response timeout.
    #[must_use]
    pub fn response_timeout_value(&self) -> Option<Duration> { self.response_timeout }

    /// Configured maximum line length.
    #[must_use]
    pub fn max_line_length_value(&self) -> usize { self.max_line_length }

    /// Whether `TCP_NODELAY` is requested.
    #[must_use]
    pub fn nodelay_value(&self) -> bool { self.nodelay }
}
