#![doc(html_root_url = "https://docs.rs/replyline/latest")]
//! Public API for the `replyline` library.
//!
//! This crate matches replies to requests on pipelined, line-oriented
//! connections where the server answers strictly in order and replies carry
//! no request identifier. A [`ResponseCorrelator`] holds at most one pending
//! wait; a [`ReplyPump`](connection::ReplyPump) feeds it decoded replies and
//! connection faults; [`PipelinedClient`] ties both to a socket.
//!
//! ```
//! use replyline::{Reply, ResponseCorrelator, error::TransportError};
//!
//! let correlator = ResponseCorrelator::<Reply, TransportError>::new();
//! let mut wait = correlator.begin_wait(2).expect("no wait pending");
//! correlator.on_reply(Reply::single(250, "sender ok"));
//! assert!(!wait.is_done());
//! correlator.on_reply(Reply::single(250, "recipient ok"));
//! let replies = wait.try_take().expect("resolved").expect("no fault");
//! assert_eq!(replies.len(), 2);
//! ```

pub mod client;
pub mod codec;
pub mod connection;
pub mod correlator;
pub mod error;
pub mod metrics;
pub mod reply;
pub mod response_future;

pub use client::{ClientConfig, ClientError, PipelinedClient, PipelinedClientBuilder};
pub use correlator::{PendingSnapshot, ReplyOutcome, ResponseCorrelator};
pub use error::{CorrelationError, TransportError, WaitError};
pub use reply::Reply;
pub use response_future::ResponseFuture;
