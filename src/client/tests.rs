//! Unit tests for the pipelined client runtime.

use std::time::Duration;

use futures::StreamExt;
use rstest::rstest;
use tokio::{
    io::{AsyncWriteExt, DuplexStream, duplex},
    task::JoinHandle,
};
use tokio_util::codec::{Framed, LinesCodec};

use super::*;
use crate::{
    codec::{CodecError, DEFAULT_LINE_LENGTH, MAX_LINE_LENGTH, MIN_LINE_LENGTH, ProtocolError},
    error::{CorrelationError, TransportError, WaitError},
};

const BUFFER: usize = 4096;

enum Step {
    Expect(usize),
    Reply(&'static str),
}

/// Run a scripted server on the far end of a duplex pipe.
///
/// Returns every command line the server read.
fn scripted(server: DuplexStream, steps: Vec<Step>) -> JoinHandle<Vec<String>> {
    tokio::spawn(async move {
        let mut framed = Framed::new(server, LinesCodec::new());
        let mut seen = Vec::new();
        for step in steps {
            match step {
                Step::Expect(n) => {
                    for _ in 0..n {
                        let line = framed
                            .next()
                            .await
                            .expect("command line")
                            .expect("valid line");
                        seen.push(line);
                    }
                }
                Step::Reply(raw) => {
                    framed
                        .get_mut()
                        .write_all(raw.as_bytes())
                        .await
                        .expect("write reply");
                }
            }
        }
        seen
    })
}

fn client(stream: DuplexStream) -> PipelinedClient<DuplexStream> {
    PipelinedClientBuilder::new().connect_stream(stream)
}

#[rstest]
#[case(1, MIN_LINE_LENGTH)]
#[case(DEFAULT_LINE_LENGTH, DEFAULT_LINE_LENGTH)]
#[case(MAX_LINE_LENGTH + 1, MAX_LINE_LENGTH)]
fn config_clamps_max_line_length(#[case] input: usize, #[case] expected: usize) {
    let config = ClientConfig::default().max_line_length(input);
    assert_eq!(config.max_line_length_value(), expected);
}

#[test]
fn config_defaults() {
    let config = ClientConfig::default();
    assert_eq!(
        config.response_timeout_value(),
        Some(DEFAULT_RESPONSE_TIMEOUT)
    );
    assert_eq!(config.max_line_length_value(), DEFAULT_LINE_LENGTH);
    assert!(config.nodelay_value());
}

#[tokio::test]
async fn builder_applies_config() {
    let (local, _remote) = duplex(BUFFER);
    let client = PipelinedClientBuilder::new()
        .response_timeout(None)
        .max_line_length(512)
        .connect_stream(local);

    assert_eq!(client.config().response_timeout_value(), None);
    assert_eq!(client.config().max_line_length_value(), 512);
}

#[tokio::test]
async fn reads_greeting_then_runs_command() {
    let (local, remote) = duplex(BUFFER);
    let server = scripted(
        remote,
        vec![
            Step::Reply("220 mx.example.com ready\r\n"),
            Step::Expect(1),
            Step::Reply("250-mx.example.com\r\n250 PIPELINING\r\n"),
        ],
    );
    let mut client = client(local);

    let greeting = client.read_greeting().await.expect("greeting");
    assert_eq!(greeting.code(), 220);

    let ehlo = client.command("EHLO me").await.expect("ehlo reply");
    assert_eq!(ehlo.lines(), ["mx.example.com", "PIPELINING"]);

    assert_eq!(server.await.expect("server task"), vec!["EHLO me"]);
}

#[tokio::test]
async fn pipelined_replies_arrive_in_order() {
    let (local, remote) = duplex(BUFFER);
    let server = scripted(
        remote,
        vec![
            Step::Expect(3),
            Step::Reply("250 sender ok\r\n250 recipient ok\r\n354 go ahead\r\n"),
        ],
    );
    let mut client = client(local);

    let replies = client
        .pipeline(&["MAIL FROM:<a@x>", "RCPT TO:<b@x>", "DATA"], 3)
        .await
        .expect("pipelined replies");

    let codes: Vec<u16> = replies.iter().map(crate::Reply::code).collect();
    assert_eq!(codes, vec![250, 250, 354]);
    assert_eq!(
        server.await.expect("server task"),
        vec!["MAIL FROM:<a@x>", "RCPT TO:<b@x>", "DATA"]
    );
    assert!(!client.correlator().is_pending());
}

#[tokio::test]
async fn overlapping_wait_is_rejected() {
    let (local, _remote) = duplex(BUFFER);
    let mut client = client(local);
    let _outstanding = client.correlator().begin_wait(1).expect("first wait");

    let err = client.command("NOOP").await.expect_err("overlap");

    assert!(matches!(
        err,
        ClientError::Wait(WaitError::AlreadyPending { expected: 1, .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn timeout_fails_wait_and_releases_slot() {
    let (local, remote) = duplex(BUFFER);
    let _server = scripted(remote, vec![Step::Expect(1)]);
    let mut client = PipelinedClientBuilder::new()
        .response_timeout(Some(Duration::from_secs(1)))
        .connect_stream(local);

    let err = client.command("NOOP").await.expect_err("timeout");

    assert!(err.is_timeout());
    assert!(matches!(
        err.transport(),
        Some(TransportError::Timeout { label: Some(label), .. }) if label == "NOOP"
    ));
    assert!(!client.correlator().is_pending());
}

#[tokio::test]
async fn peer_close_fails_pending_wait() {
    let (local, remote) = duplex(BUFFER);
    let server = scripted(remote, vec![Step::Expect(1), Step::Reply("250 ")]);
    let mut client = client(local);

    let result = client.command("NOOP").await;
    server.await.expect("server task");

    assert!(matches!(
        result,
        Err(ClientError::Correlation(CorrelationError::Fault(
            TransportError::Codec(CodecError::Eof(_))
        )))
    ));
}

#[tokio::test]
async fn command_with_line_break_is_rejected_and_slot_released() {
    let (local, _remote) = duplex(BUFFER);
    let mut client = client(local);

    let err = client
        .command("NOOP\r\nQUIT")
        .await
        .expect_err("embedded line break");

    assert!(matches!(
        err.transport(),
        Some(TransportError::Codec(CodecError::Protocol(
            ProtocolError::EmbeddedLineBreak
        )))
    ));
    assert!(!client.correlator().is_pending());
}

#[tokio::test]
async fn batch_with_invalid_command_sends_nothing() {
    let (local, remote) = duplex(BUFFER);
    let server = scripted(remote, vec![Step::Expect(1), Step::Reply("221 bye\r\n")]);
    let mut client = client(local);

    let err = client
        .pipeline(&["NOOP", "BAD\r\nX"], 2)
        .await
        .expect_err("second command is invalid");
    assert!(matches!(
        err.transport(),
        Some(TransportError::Codec(CodecError::Protocol(
            ProtocolError::EmbeddedLineBreak
        )))
    ));
    assert!(!client.correlator().is_pending());

    let quit = client.command("QUIT").await.expect("quit reply");

    assert_eq!(quit.code(), 221);
    assert_eq!(server.await.expect("server task"), vec!["QUIT"]);
}

#[tokio::test]
async fn rejected_send_leaves_next_exchange_intact() {
    let (local, remote) = duplex(BUFFER);
    let server = scripted(remote, vec![Step::Expect(1), Step::Reply("250 ok\r\n")]);
    let mut client = client(local);

    client.send("RSET\nNOOP").await.expect_err("embedded line break");
    let reply = client.command("NOOP").await.expect("noop reply");

    assert_eq!(reply.code(), 250);
    assert_eq!(server.await.expect("server task"), vec!["NOOP"]);
}

#[tokio::test]
async fn wait_after_disconnect_fails_immediately() {
    let (local, remote) = duplex(BUFFER);
    drop(remote);
    let mut client = PipelinedClientBuilder::new()
        .response_timeout(None)
        .connect_stream(local);
    while !client.is_closed() {
        tokio::task::yield_now().await;
    }

    let err = client.expect_replies(1).await.expect_err("closed");

    assert!(matches!(
        err.transport(),
        Some(TransportError::Disconnected)
    ));
}

#[tokio::test]
async fn send_writes_without_waiting() {
    let (local, remote) = duplex(BUFFER);
    let mut framed = Framed::new(remote, LinesCodec::new());
    let mut client = client(local);

    client.send("RSET").await.expect("send");

    let line = framed.next().await.expect("line").expect("valid line");
    assert_eq!(line, "RSET");
    assert!(!client.correlator().is_pending());
}

#[tokio::test]
async fn close_stops_pump() {
    let (local, remote) = duplex(BUFFER);
    let server = scripted(
        remote,
        vec![Step::Reply("220 ready\r\n"), Step::Expect(1)],
    );
    let mut client = client(local);
    client.read_greeting().await.expect("greeting");
    client.send("QUIT").await.expect("send");

    let report = client.close().await.expect("close");

    assert_eq!(report.replies, 1);
    assert_eq!(server.await.expect("server task"), vec!["QUIT"]);
}
