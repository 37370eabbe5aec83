//! Error types for the reply and command codecs.
//!
//! - [`FramingError`]: line boundary problems (overlong lines).
//! - [`ProtocolError`]: a complete line that is not a valid status line, or a
//!   command that cannot be framed.
//! - [`EofError`]: the stream ended part-way through a reply.
//! - [`CodecError`]: top-level enum wrapping all categories plus I/O errors.

use std::io;

use thiserror::Error;

/// Line boundary errors.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FramingError {
    /// A line exceeded the configured maximum without a terminator.
    #[error("line exceeds max length: {len} > {max}")]
    LineTooLong {
        /// Bytes seen for the line so far.
        len: usize,
        /// Maximum allowed line length.
        max: usize,
    },
}

/// Violations of the status line grammar.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// The line does not start with a three-digit code followed by a space,
    /// a hyphen, or the end of the line.
    #[error("malformed status line: {line:?}")]
    MalformedStatus {
        /// Offending line, lossily decoded.
        line: String,
    },

    /// A continuation line carried a different code from the first line.
    #[error("inconsistent reply code: expected {expected}, got {found}")]
    InconsistentCode {
        /// Code of the first line of the reply.
        expected: u16,
        /// Code found on the offending line.
        found: u16,
    },

    /// Line text is not valid UTF-8.
    #[error("reply text is not valid UTF-8")]
    InvalidUtf8,

    /// An outbound command contains a line terminator.
    #[error("command contains a line terminator")]
    EmbeddedLineBreak,
}

/// The stream ended before a reply was complete.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum EofError {
    /// EOF after some lines of a multi-line reply or within a line.
    #[error("premature EOF: {lines_buffered} lines and {bytes_buffered} bytes of a reply received")]
    MidReply {
        /// Complete continuation lines buffered.
        lines_buffered: usize,
        /// Bytes of an unterminated line buffered.
        bytes_buffered: usize,
    },
}

/// Top-level codec error taxonomy.
///
/// # Examples
///
/// ```
/// use replyline::codec::{CodecError, FramingError};
///
/// let err = CodecError::Framing(FramingError::LineTooLong { len: 5000, max: 4096 });
/// assert_eq!(err.to_string(), "framing error: line exceeds max length: 5000 > 4096");
/// ```
#[derive(Debug, Error)]
pub enum CodecError {
    /// Line boundary error.
    #[error("framing error: {0}")]
    Framing(#[from] FramingError),

    /// Status line grammar error.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Transport layer I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// End-of-stream inside a reply.
    #[error("EOF: {0}")]
    Eof(#[from] EofError),
}

impl CodecError {
    /// Returns `true` when the error was raised by the transport rather than by
    /// the content of the stream.
    #[must_use]
    pub fn is_io(&self) -> bool { matches!(self, Self::Io(_)) }
}
