//! Decoded status replies.
//!
//! A [`Reply`] is one complete server response: a three-digit status code and
//! one or more text lines. Multi-line replies arrive on the wire as
//! `250-first`, `250-second`, `250 last`; the codec folds them into a single
//! value before they reach the correlator.

use std::fmt;

/// One complete status reply.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Reply {
    code: u16,
    lines: Vec<String>,
}

impl Reply {
    /// Build a reply from a status code and its text lines.
    ///
    /// A reply always carries at least one line; an empty `lines` is stored as
    /// a single empty line.
    #[must_use]
    pub fn new(code: u16, lines: Vec<String>) -> Self {
        let lines = if lines.is_empty() {
            vec![String::new()]
        } else {
            lines
        };
        Self { code, lines }
    }

    /// Build a single-line reply.
    #[must_use]
    pub fn single(code: u16, text: impl Into<String>) -> Self { Self::new(code, vec![text.into()]) }

    /// Three-digit status code.
    #[must_use]
    pub fn code(&self) -> u16 { self.code }

    /// Text lines, in wire order.
    #[must_use]
    pub fn lines(&self) -> &[String] { &self.lines }

    /// `2xx`: the requested action completed.
    #[must_use]
    pub fn is_positive_completion(&self) -> bool { self.class() == 2 }

    /// `3xx`: the server awaits more input.
    #[must_use]
    pub fn is_positive_intermediate(&self) -> bool { self.class() == 3 }

    /// `4xx`: the command failed but may succeed if retried.
    #[must_use]
    pub fn is_transient_failure(&self) -> bool { self.class() == 4 }

    /// `5xx`: the command failed and should not be retried as-is.
    #[must_use]
    pub fn is_permanent_failure(&self) -> bool { self.class() == 5 }

    fn class(&self) -> u16 { self.code / 100 }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code)?;
        for line in &self.lines {
            if !line.is_empty() {
                write!(f, " {line}")?;
            }
        }
        Ok(())
    }
}
