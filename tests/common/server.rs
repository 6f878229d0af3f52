//! Fake chat server.
//!
//! Speaks WebSocket over an in-memory duplex pipe, so sessions can be
//! driven without TLS or a network.

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite, DuplexStream, ReadBuf};
use tokio::time::timeout;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::Role;

/// Server half of an in-memory WebSocket connection.
pub struct FakeServer {
    ws: WebSocketStream<DuplexStream>,
}

/// Create a connected (client stream, fake server) pair.
#[allow(dead_code)]
pub async fn pair() -> (WebSocketStream<DuplexStream>, FakeServer) {
    let (a, b) = tokio::io::duplex(64 * 1024);
    let client = WebSocketStream::from_raw_socket(a, Role::Client, None).await;
    let server = WebSocketStream::from_raw_socket(b, Role::Server, None).await;
    (client, FakeServer { ws: server })
}

/// Client transport whose write side can be cut while reads keep working.
pub struct BreakableStream {
    inner: DuplexStream,
    broken: Arc<AtomicBool>,
}

impl BreakableStream {
    fn check(&self) -> io::Result<()> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "write side cut"));
        }
        Ok(())
    }
}

impl AsyncRead for BreakableStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl AsyncWrite for BreakableStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.check()?;
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.check()?;
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

/// Like [`pair`], but the returned flag cuts the client's write side.
#[allow(dead_code)]
pub async fn breakable_pair() -> (WebSocketStream<BreakableStream>, FakeServer, Arc<AtomicBool>) {
    let (a, b) = tokio::io::duplex(64 * 1024);
    let broken = Arc::new(AtomicBool::new(false));
    let stream = BreakableStream {
        inner: a,
        broken: broken.clone(),
    };
    let client = WebSocketStream::from_raw_socket(stream, Role::Client, None).await;
    let server = WebSocketStream::from_raw_socket(b, Role::Server, None).await;
    (client, FakeServer { ws: server }, broken)
}

impl FakeServer {
    /// Send raw protocol text as one frame.
    pub async fn send(&mut self, text: &str) -> anyhow::Result<()> {
        self.ws.send(Message::Text(text.to_string())).await?;
        Ok(())
    }

    /// Receive the next text frame from the client.
    pub async fn recv_line(&mut self) -> anyhow::Result<String> {
        self.recv_line_timeout(Duration::from_secs(2)).await
    }

    pub async fn recv_line_timeout(&mut self, dur: Duration) -> anyhow::Result<String> {
        loop {
            match timeout(dur, self.ws.next()).await? {
                Some(Ok(Message::Text(text))) => return Ok(text),
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
                Some(Ok(other)) => anyhow::bail!("unexpected frame: {other:?}"),
                Some(Err(e)) => return Err(e.into()),
                None => anyhow::bail!("client hung up"),
            }
        }
    }

    /// Assert nothing arrives within `dur`.
    pub async fn expect_silence(&mut self, dur: Duration) {
        if let Ok(frame) = timeout(dur, self.ws.next()).await {
            panic!("expected no frames, got {frame:?}");
        }
    }

    /// Wait for the client's close frame.
    pub async fn expect_close(&mut self) -> anyhow::Result<()> {
        match timeout(Duration::from_secs(2), self.ws.next()).await? {
            Some(Ok(Message::Close(_))) => Ok(()),
            other => anyhow::bail!("expected close frame, got {other:?}"),
        }
    }

    /// Start the close handshake from the server side.
    pub async fn close(&mut self) -> anyhow::Result<()> {
        self.ws.close(None).await?;
        Ok(())
    }
}
