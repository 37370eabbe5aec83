//! A TCP server that plays back a fixed script.
//!
//! The server accepts a single connection, then walks its [`Step`]s in
//! order: reading command lines, writing raw reply bytes, pausing, or
//! closing the socket. Every command line read is returned from
//! [`ScriptedServer::finish`] so tests can assert on what the client sent.

use std::{io, net::SocketAddr, time::Duration};

use futures::StreamExt;
use tokio::{
    io::AsyncWriteExt,
    net::TcpListener,
    task::JoinHandle,
};
use tokio_util::codec::{Framed, LinesCodec};

/// One action performed by a [`ScriptedServer`].
#[derive(Clone, Debug)]
pub enum Step {
    /// Read this many command lines.
    Expect(usize),
    /// Write these bytes verbatim. Line terminators are the caller's job.
    Reply(Vec<u8>),
    /// Sleep before the next step.
    Pause(Duration),
    /// Close the connection, ignoring any remaining steps.
    Close,
}

impl Step {
    /// Write `raw` verbatim.
    pub fn reply(raw: impl Into<Vec<u8>>) -> Self { Self::Reply(raw.into()) }
}

/// Handle to a running scripted server.
#[derive(Debug)]
pub struct ScriptedServer {
    addr: SocketAddr,
    task: JoinHandle<Vec<String>>,
}

impl ScriptedServer {
    /// Bind an ephemeral local port and start serving `script`.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be bound.
    pub async fn spawn(script: Vec<Step>) -> io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let task = tokio::spawn(async move {
            let Ok((stream, _)) = listener.accept().await else {
                return Vec::new();
            };
            play(Framed::new(stream, LinesCodec::new()), script).await
        });
        Ok(Self { addr, task })
    }

    /// Address clients should connect to.
    #[must_use]
    pub fn addr(&self) -> SocketAddr { self.addr }

    /// Wait for the script to finish and return the command lines read.
    ///
    /// # Panics
    ///
    /// Panics if the server task panicked.
    pub async fn finish(self) -> Vec<String> { self.task.await.expect("scripted server panicked") }
}

async fn play<T>(mut framed: Framed<T, LinesCodec>, script: Vec<Step>) -> Vec<String>
where
    T: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    let mut seen = Vec::new();
    for step in script {
        match step {
            Step::Expect(n) => {
                for _ in 0..n {
                    match framed.next().await {
                        Some(Ok(line)) => seen.push(line),
                        Some(Err(_)) | None => return seen,
                    }
                }
            }
            Step::Reply(raw) => {
                if framed.get_mut().write_all(&raw).await.is_err() {
                    return seen;
                }
            }
            Step::Pause(delay) => tokio::time::sleep(delay).await,
            Step::Close => break,
        }
    }
    seen
}
