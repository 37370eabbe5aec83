//! Pipelined client for line-oriented status reply protocols.
//!
//! [`PipelinedClient`] splits a connection into a write half, used to send
//! commands, and a read half driven by a background
//! [`ReplyPump`](crate::connection::ReplyPump). The two meet at a shared
//! [`ResponseCorrelator`](crate::ResponseCorrelator): every batch of commands
//! registers one wait for the number of replies it will produce.

mod builder;
mod config;
mod error;
mod runtime;

pub use builder::PipelinedClientBuilder;
pub use config::{ClientConfig, DEFAULT_RESPONSE_TIMEOUT};
pub use error::ClientError;
pub use runtime::{PipelinedClient, ReplyCorrelator};

#[cfg(all(test, not(loom)))]
mod tests;
