//! Connection establishment and the three-line join handshake.

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info};

use chatvox_core::error::{ChatvoxError, Result};

/// Anonymous-read nick accepted by Twitch IRC.
pub const ANON_NICK: &str = "justinfan123";

/// A live, joined chat session. At most one exists per process; a reconnect
/// replaces it wholesale.
pub struct Session<S> {
    stream: S,
    channel: String,
}

impl Session<TcpStream> {
    /// Connect to `addr` and join `channel` using `token` as the PASS
    /// credential. `channel` must carry its leading `#`.
    pub async fn connect(addr: &str, channel: &str, token: &str) -> Result<Self> {
        debug!(addr, channel, "connecting to chat server");

        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| ChatvoxError::Connection(format!("connect {addr}: {e}")))?;

        let session = Self::handshake(stream, channel, token).await?;
        info!(channel, "joined channel");
        Ok(session)
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin> Session<S> {
    /// Perform the join handshake on an already-open stream.
    ///
    /// Generic over the stream so the wire bytes are testable without a
    /// network.
    pub async fn handshake(mut stream: S, channel: &str, token: &str) -> Result<Self> {
        for line in [
            format!("NICK {ANON_NICK}\r\n"),
            format!("PASS {token}\r\n"),
            format!("JOIN {channel}\r\n"),
        ] {
            stream
                .write_all(line.as_bytes())
                .await
                .map_err(|e| ChatvoxError::Connection(format!("handshake write: {e}")))?;
        }

        Ok(Self {
            stream,
            channel: channel.to_string(),
        })
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub(crate) fn stream_mut(&mut self) -> &mut S {
        &mut self.stream
    }
}
