//! Command line interface for the `replyline` demo binary.
//!
//! Connects to a line-oriented server and pipelines the given commands,
//! printing each reply as it is matched.

use clap::Parser;

/// Command line arguments for the `replyline` binary.
#[derive(Debug, Parser)]
#[command(
    name = "replyline",
    version,
    about = "Pipeline commands to a line-oriented server and print the replies"
)]
pub struct Cli {
    /// Server address, as `host:port`.
    #[arg(short, long, default_value = "127.0.0.1:25")]
    pub addr: String,

    /// Seconds to wait for each batch of replies; 0 waits indefinitely.
    #[arg(short, long, default_value_t = 300)]
    pub timeout_secs: u64,

    /// Do not wait for a server greeting after connecting.
    #[arg(long)]
    pub no_greeting: bool,

    /// Commands to send in one pipelined batch, one reply expected each.
    pub commands: Vec<String>,
}
