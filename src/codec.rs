//! Line codecs for status replies and commands.
//!
//! [`ReplyCodec`] splits an inbound byte stream into complete [`Reply`]
//! values, folding `NNN-text` continuation lines into the reply they belong
//! to. [`CommandCodec`] frames outbound command lines with CRLF.
//!
//! Both plug into `tokio_util`'s `FramedRead`/`FramedWrite`.

use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::reply::Reply;

pub mod error;

pub use error::{CodecError, EofError, FramingError, ProtocolError};

/// Minimum line length in bytes.
///
/// Lengths passed to [`ReplyCodec::new`] are clamped to at least this value.
pub const MIN_LINE_LENGTH: usize = 64;

/// Maximum line length in bytes (1 MiB).
pub const MAX_LINE_LENGTH: usize = 1024 * 1024;

/// Default line length limit.
pub const DEFAULT_LINE_LENGTH: usize = 4096;

pub(crate) fn clamp_line_length(value: usize) -> usize {
    value.clamp(MIN_LINE_LENGTH, MAX_LINE_LENGTH)
}

const CRLF: &[u8] = b"\r\n";

/// Decoder producing one [`Reply`] per complete status reply.
///
/// # Examples
///
/// ```
/// use bytes::BytesMut;
/// use replyline::{Reply, codec::ReplyCodec};
/// use tokio_util::codec::Decoder;
///
/// let mut codec = ReplyCodec::default();
/// let mut buf = BytesMut::from(&b"250-mx.example.com\r\n250 PIPELINING\r\n"[..]);
/// let reply = codec.decode(&mut buf).expect("valid reply").expect("complete");
/// assert_eq!(
///     reply,
///     Reply::new(250, vec!["mx.example.com".into(), "PIPELINING".into()])
/// );
/// ```
#[derive(Clone, Debug)]
pub struct ReplyCodec {
    max_line_length: usize,
    code: Option<u16>,
    lines: Vec<String>,
    // Bytes of `src` already searched for a terminator.
    scanned: usize,
}

impl ReplyCodec {
    /// Construct a codec with a maximum line length.
    #[must_use]
    pub fn new(max_line_length: usize) -> Self {
        Self {
            max_line_length: clamp_line_length(max_line_length),
            code: None,
            lines: Vec::new(),
            scanned: 0,
        }
    }

    /// Return the maximum line length accepted by this codec.
    #[must_use]
    pub fn max_line_length(&self) -> usize { self.max_line_length }

    fn reset(&mut self) {
        self.code = None;
        self.lines.clear();
        self.scanned = 0;
    }

    fn next_line(&mut self, src: &mut BytesMut) -> Result<Option<BytesMut>, CodecError> {
        let Some(offset) = src[self.scanned..].iter().position(|b| *b == b'\n') else {
            self.scanned = src.len();
            // A trailing CR may be the first half of a split terminator.
            let len = if src.last() == Some(&b'\r') {
                src.len() - 1
            } else {
                src.len()
            };
            if len > self.max_line_length {
                return Err(FramingError::LineTooLong {
                    len,
                    max: self.max_line_length,
                }
                .into());
            }
            return Ok(None);
        };
        let end = self.scanned + offset;
        self.scanned = 0;
        let mut line = src.split_to(end + 1);
        line.truncate(end);
        if line.last() == Some(&b'\r') {
            line.truncate(end - 1);
        }
        if line.len() > self.max_line_length {
            return Err(FramingError::LineTooLong {
                len: line.len(),
                max: self.max_line_length,
            }
            .into());
        }
        Ok(Some(line))
    }

    fn accept_line(&mut self, line: &[u8]) -> Result<Option<Reply>, CodecError> {
        let (code, last, text) = parse_status_line(line)?;
        match self.code {
            Some(expected) if expected != code => {
                return Err(ProtocolError::InconsistentCode {
                    expected,
                    found: code,
                }
                .into());
            }
            Some(_) => {}
            None => self.code = Some(code),
        }
        self.lines.push(text);
        if !last {
            return Ok(None);
        }
        self.code = None;
        Ok(Some(Reply::new(code, std::mem::take(&mut self.lines))))
    }
}

impl Default for ReplyCodec {
    fn default() -> Self { Self::new(DEFAULT_LINE_LENGTH) }
}

/// Split a status line into its code, final-line flag, and text.
fn parse_status_line(line: &[u8]) -> Result<(u16, bool, String), CodecError> {
    let malformed = || ProtocolError::MalformedStatus {
        line: String::from_utf8_lossy(line).into_owned(),
    };
    let Some(digits) = line.get(..3) else {
        return Err(malformed().into());
    };
    if !digits.iter().all(u8::is_ascii_digit) {
        return Err(malformed().into());
    }
    let code = digits
        .iter()
        .fold(0u16, |acc, d| acc * 10 + u16::from(d - b'0'));
    let last = match line.get(3) {
        None | Some(b' ') => true,
        Some(b'-') => false,
        Some(_) => return Err(malformed().into()),
    };
    let text = line.get(4..).unwrap_or_default();
    let text = std::str::from_utf8(text).map_err(|_| ProtocolError::InvalidUtf8)?;
    Ok((code, last, text.to_owned()))
}

impl Decoder for ReplyCodec {
    type Item = Reply;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            let line = match self.next_line(src) {
                Ok(Some(line)) => line,
                Ok(None) => return Ok(None),
                Err(e) => {
                    self.reset();
                    return Err(e);
                }
            };
            match self.accept_line(&line) {
                Ok(Some(reply)) => return Ok(Some(reply)),
                Ok(None) => {}
                Err(e) => {
                    self.reset();
                    return Err(e);
                }
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(reply) = self.decode(src)? {
            return Ok(Some(reply));
        }
        if src.is_empty() && self.lines.is_empty() {
            return Ok(None);
        }
        let err = EofError::MidReply {
            lines_buffered: self.lines.len(),
            bytes_buffered: src.len(),
        };
        self.reset();
        src.clear();
        Err(err.into())
    }
}

/// Check that `command` fits on one line.
///
/// # Errors
///
/// Returns [`ProtocolError::EmbeddedLineBreak`] if `command` contains `\r`
/// or `\n`.
pub fn validate_command(command: &str) -> Result<(), ProtocolError> {
    if command.bytes().any(|b| b == b'\r' || b == b'\n') {
        return Err(ProtocolError::EmbeddedLineBreak);
    }
    Ok(())
}

/// Encoder appending CRLF to each command line.
///
/// Commands containing `\r` or `\n` are rejected: they would split into extra
/// lines on the wire and desynchronise reply counting.
#[derive(Clone, Copy, Debug, Default)]
pub struct CommandCodec;

impl Encoder<&str> for CommandCodec {
    type Error = CodecError;

    fn encode(&mut self, item: &str, dst: &mut BytesMut) -> Result<(), Self::Error> {
        validate_command(item)?;
        dst.reserve(item.len() + CRLF.len());
        dst.put_slice(item.as_bytes());
        dst.put_slice(CRLF);
        Ok(())
    }
}

impl Encoder<String> for CommandCodec {
    type Error = CodecError;

    fn encode(&mut self, item: String, dst: &mut BytesMut) -> Result<(), Self::Error> {
        <Self as Encoder<&str>>::encode(self, item.as_str(), dst)
    }
}
