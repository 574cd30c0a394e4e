//! Protocol reader: reassembles the byte stream into lines, extracts chat
//! messages onto the speech queue, and answers liveness probes.

use std::sync::OnceLock;

use regex::Regex;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use chatvox_core::error::{ChatvoxError, Result};
use chatvox_core::types::{ChatMessage, QueueItem, QueueSender};

use crate::session::Session;

const READ_BUF_SIZE: usize = 2048;
const PONG_REPLY: &[u8] = b"PONG :tmi.twitch.tv\r\n";

fn privmsg_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"PRIVMSG #\w+ :(.+)").unwrap())
}

/// Extract the chat-message body from a protocol line, if it is one.
///
/// The body is everything after the `:` separator, exactly as sent. A
/// PRIVMSG marker with no body does not match — such lines are dropped.
pub fn parse_privmsg(line: &str) -> Option<&str> {
    privmsg_pattern()
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Whether a line is a server liveness probe.
pub fn is_ping(line: &str) -> bool {
    line.contains("PING")
}

/// Consumes a session's byte stream until cancellation or a read failure.
///
/// Lines are not guaranteed to arrive whole, so partial input is buffered
/// across reads and only complete lines are classified.
pub struct Reader<S> {
    session: Session<S>,
    buf: Vec<u8>,
}

impl<S: AsyncRead + AsyncWrite + Unpin> Reader<S> {
    pub fn new(session: Session<S>) -> Self {
        Self {
            session,
            buf: Vec::new(),
        }
    }

    /// Run the read loop, enqueueing chat messages on `queue`.
    ///
    /// Returns `Ok(())` on cancellation, `Err(Read)` when the stream closes
    /// or a read fails — the caller owns the reconnect-or-exit decision.
    pub async fn run(mut self, queue: &QueueSender, cancel: &CancellationToken) -> Result<()> {
        let mut read_buf = [0u8; READ_BUF_SIZE];

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("reader cancelled");
                    return Ok(());
                }
                read = self.session.stream_mut().read(&mut read_buf) => match read {
                    Ok(0) => {
                        return Err(ChatvoxError::Read("connection closed by server".into()));
                    }
                    Ok(n) => {
                        self.buf.extend_from_slice(&read_buf[..n]);
                        self.drain_lines(queue).await?;
                    }
                    Err(e) => {
                        return Err(ChatvoxError::Read(e.to_string()));
                    }
                },
            }
        }
    }

    /// Process every complete line currently buffered, keeping any trailing
    /// partial line for the next read.
    async fn drain_lines(&mut self, queue: &QueueSender) -> Result<()> {
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let line_bytes: Vec<u8> = self.buf.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line_bytes);
            let line = line.trim_end_matches(['\n', '\r']);

            if line.is_empty() {
                continue;
            }

            self.handle_line(line, queue).await?;
        }
        Ok(())
    }

    async fn handle_line(&mut self, line: &str, queue: &QueueSender) -> Result<()> {
        if let Some(text) = parse_privmsg(line) {
            debug!(text, "received chat message");
            if queue.send(QueueItem::Message(ChatMessage::new(text))).is_err() {
                warn!("speech queue closed, dropping message");
            }
        } else if is_ping(line) {
            // Answered before reading further lines, to avoid being
            // disconnected for unresponsiveness.
            trace!("answering liveness probe");
            self.session
                .stream_mut()
                .write_all(PONG_REPLY)
                .await
                .map_err(|e| ChatvoxError::Read(format!("pong write: {e}")))?;
        } else {
            trace!(line, "ignoring protocol line");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::sync::mpsc;

    #[test]
    fn test_parse_privmsg_extracts_exact_body() {
        let line = ":nick!nick@host PRIVMSG #teststream :hello world";
        assert_eq!(parse_privmsg(line), Some("hello world"));
    }

    #[test]
    fn test_parse_privmsg_keeps_inner_colons_and_spaces() {
        let line = "PRIVMSG #chan :one : two :three ";
        assert_eq!(parse_privmsg(line), Some("one : two :three "));
    }

    #[test]
    fn test_parse_privmsg_empty_body_is_none() {
        assert_eq!(parse_privmsg("PRIVMSG #teststream :"), None);
        assert_eq!(parse_privmsg("PRIVMSG #teststream"), None);
    }

    #[test]
    fn test_parse_privmsg_ignores_unrelated_lines() {
        assert_eq!(parse_privmsg("PING :tmi.twitch.tv"), None);
        assert_eq!(parse_privmsg(":tmi.twitch.tv 001 justinfan123 :Welcome"), None);
    }

    #[test]
    fn test_privmsg_body_containing_ping_is_still_a_message() {
        // handle_line checks PRIVMSG before PING, so this line is spoken,
        // not answered.
        let line = "PRIVMSG #chan :PING me later";
        assert_eq!(parse_privmsg(line), Some("PING me later"));
    }

    #[test]
    fn test_is_ping() {
        assert!(is_ping("PING :tmi.twitch.tv"));
        assert!(!is_ping(":tmi.twitch.tv 372 justinfan123 :motd"));
    }

    /// Build a reader over an in-memory duplex; returns the far end and the
    /// queue receiver.
    async fn reader_fixture() -> (
        tokio::io::DuplexStream,
        mpsc::UnboundedReceiver<QueueItem>,
        CancellationToken,
        tokio::task::JoinHandle<Result<()>>,
    ) {
        let (near, far) = tokio::io::duplex(4096);
        let session = Session::handshake(near, "#teststream", "oauth:token")
            .await
            .unwrap();
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let cancel_clone = cancel.clone();
        let handle =
            tokio::spawn(async move { Reader::new(session).run(&tx, &cancel_clone).await });
        (far, rx, cancel, handle)
    }

    /// Drain the handshake bytes the fixture session wrote.
    async fn skip_handshake(far: &mut tokio::io::DuplexStream) {
        let mut buf = vec![0u8; 256];
        let _ = far.read(&mut buf).await.unwrap();
    }

    #[tokio::test]
    async fn test_messages_enqueued_in_arrival_order() {
        let (mut far, mut rx, cancel, handle) = reader_fixture().await;
        skip_handshake(&mut far).await;

        far.write_all(
            b"PRIVMSG #teststream :first\r\nPRIVMSG #teststream :second\r\nPRIVMSG #teststream :third\r\n",
        )
        .await
        .unwrap();

        for expected in ["first", "second", "third"] {
            let item = rx.recv().await.unwrap();
            assert_eq!(item, QueueItem::Message(ChatMessage::new(expected)));
        }

        cancel.cancel();
        assert!(handle.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_partial_line_reassembled_across_reads() {
        let (mut far, mut rx, cancel, handle) = reader_fixture().await;
        skip_handshake(&mut far).await;

        far.write_all(b"PRIVMSG #teststream :hello ").await.unwrap();
        far.write_all(b"world\r").await.unwrap();
        far.write_all(b"\n").await.unwrap();

        let item = rx.recv().await.unwrap();
        assert_eq!(item, QueueItem::Message(ChatMessage::new("hello world")));

        cancel.cancel();
        assert!(handle.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_exactly_one_pong_per_ping() {
        let (mut far, mut rx, cancel, handle) = reader_fixture().await;
        skip_handshake(&mut far).await;

        far.write_all(b"PING :tmi.twitch.tv\r\nPRIVMSG #teststream :after\r\n")
            .await
            .unwrap();

        // The message arriving proves the PING was already handled.
        let item = rx.recv().await.unwrap();
        assert_eq!(item, QueueItem::Message(ChatMessage::new("after")));

        let mut buf = vec![0u8; 256];
        let n = far.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"PONG :tmi.twitch.tv\r\n");

        cancel.cancel();
        assert!(handle.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_empty_body_and_junk_enqueue_nothing() {
        let (mut far, mut rx, cancel, handle) = reader_fixture().await;
        skip_handshake(&mut far).await;

        far.write_all(b"PRIVMSG #teststream :\r\n").await.unwrap();
        far.write_all(b":tmi.twitch.tv 001 justinfan123 :Welcome\r\n")
            .await
            .unwrap();
        far.write_all(b"\r\n").await.unwrap();
        far.write_all(b"PRIVMSG #teststream :real one\r\n")
            .await
            .unwrap();

        let item = rx.recv().await.unwrap();
        assert_eq!(item, QueueItem::Message(ChatMessage::new("real one")));

        cancel.cancel();
        assert!(handle.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_stream_close_is_read_failure() {
        let (mut far, _rx, _cancel, handle) = reader_fixture().await;
        skip_handshake(&mut far).await;

        drop(far);

        let result = handle.await.unwrap();
        assert!(matches!(result, Err(ChatvoxError::Read(_))));
    }
}
