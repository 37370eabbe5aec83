//! Demo binary for `replyline`.
//!
//! Connects, optionally reads the greeting, pipelines the commands given on
//! the command line and prints each reply.

mod cli;

use std::{process::ExitCode, time::Duration};

use clap::Parser;
use replyline::{ClientError, PipelinedClient};

#[tokio::main]
async fn main() -> ExitCode {
    // Applications embedding the library should install their own subscriber.
    tracing_subscriber::fmt::init();

    let cli = cli::Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(%error, "session failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: cli::Cli) -> Result<(), ClientError> {
    let timeout = (cli.timeout_secs > 0).then(|| Duration::from_secs(cli.timeout_secs));
    let mut client = PipelinedClient::builder()
        .response_timeout(timeout)
        .connect(cli.addr.as_str())
        .await?;

    if !cli.no_greeting {
        println!("{}", client.read_greeting().await?);
    }
    if !cli.commands.is_empty() {
        for reply in client
            .pipeline(cli.commands.as_slice(), cli.commands.len())
            .await?
        {
            println!("{reply}");
        }
    }

    let report = client.close().await?;
    tracing::info!(
        replies = report.replies,
        discarded = report.discarded,
        outcome = ?report.outcome,
        "connection closed"
    );
    Ok(())
}
