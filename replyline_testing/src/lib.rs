//! Test utilities for `replyline`.
//!
//! [`ScriptedServer`] plays a line-oriented server from a fixed script so
//! client behaviour can be checked against exact byte sequences, and
//! [`logger`] captures `log` records for assertions.
//!
//! ```rust,no_run
//! use replyline::PipelinedClient;
//! use replyline_testing::{ScriptedServer, Step};
//!
//! # async fn example() {
//! let server = ScriptedServer::spawn(vec![
//!     Step::reply("220 ready\r\n"),
//!     Step::Expect(1),
//!     Step::reply("250 ok\r\n"),
//! ])
//! .await
//! .expect("bind");
//! let mut client = PipelinedClient::builder()
//!     .connect(server.addr())
//!     .await
//!     .expect("connect");
//! client.read_greeting().await.expect("greeting");
//! client.command("NOOP").await.expect("reply");
//! assert_eq!(server.finish().await, vec!["NOOP"]);
//! # }
//! ```

pub mod logging;
pub mod scripted_server;

pub use logging::{LoggerHandle, logger};
pub use scripted_server::{ScriptedServer, Step};
