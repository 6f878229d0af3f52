//! WebSocket transport for the chat protocol.
//!
//! The chat service speaks the line protocol inside WebSocket text frames.
//! [`split`] turns an upgraded stream into an [`IrcReader`] that feeds frames
//! through a bounded [`FrameBuffer`] and an [`IrcWriter`] that sends one
//! [`ClientCommand`] per text frame.

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::tungstenite::{Error as WsError, Message as WsMessage};
use tokio_tungstenite::WebSocketStream;
use tracing::trace;

use crate::buffer::FrameBuffer;
use crate::command::ClientCommand;
use crate::error::ProtocolError;
use crate::message::InboundMessage;

/// Errors that can occur when reading from a transport.
#[derive(Debug, Error)]
pub enum TransportReadError {
    /// A protocol error occurred.
    #[error("transport protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The WebSocket layer failed.
    #[error("transport websocket error: {0}")]
    WebSocket(#[from] WsError),
}

/// Split an upgraded WebSocket into its write and read halves.
pub fn split<S>(stream: WebSocketStream<S>, max_buffer_len: usize) -> (IrcWriter<S>, IrcReader<S>)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (sink, stream) = stream.split();
    (
        IrcWriter { sink },
        IrcReader {
            stream,
            buffer: FrameBuffer::new(max_buffer_len),
            closed: false,
        },
    )
}

/// Read half: yields owned messages decoded from text frames.
pub struct IrcReader<S> {
    stream: SplitStream<WebSocketStream<S>>,
    buffer: FrameBuffer,
    closed: bool,
}

impl<S> IrcReader<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Read the next actionable message.
    ///
    /// Returns `None` on a close frame or end of stream. Binary and control
    /// frames are skipped; tungstenite answers WebSocket pings itself.
    pub async fn next(&mut self) -> Option<Result<InboundMessage, TransportReadError>> {
        loop {
            match self.buffer.next_message() {
                Ok(Some(msg)) => return Some(Ok(msg)),
                Ok(None) => {}
                Err(e) => return Some(Err(e.into())),
            }

            if self.closed {
                return None;
            }

            match self.stream.next().await {
                Some(Ok(WsMessage::Text(text))) => {
                    trace!(len = text.len(), "text frame");
                    self.buffer.push(text.as_bytes());
                }
                Some(Ok(WsMessage::Close(frame))) => {
                    trace!(?frame, "close frame");
                    self.closed = true;
                    return None;
                }
                None => {
                    self.closed = true;
                    return None;
                }
                Some(Ok(WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_))) => continue,
                Some(Ok(WsMessage::Binary(_))) => continue,
                Some(Err(e)) => {
                    self.closed = true;
                    return Some(Err(e.into()));
                }
            }
        }
    }

    /// `true` once the peer closed the stream or it failed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

/// Write half: one command per text frame.
pub struct IrcWriter<S> {
    sink: SplitSink<WebSocketStream<S>, WsMessage>,
}

impl<S> IrcWriter<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Send a command as a single text frame.
    pub async fn send(&mut self, command: &ClientCommand) -> Result<(), WsError> {
        self.sink.send(WsMessage::Text(command.to_string())).await
    }

    /// Send a close frame and flush.
    pub async fn close(&mut self) -> Result<(), WsError> {
        self.sink.close().await
    }
}
