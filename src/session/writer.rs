//! Serialized write path.
//!
//! Every outbound line goes through [`SessionWriter::send`], which holds a
//! single-slot async lock for the duration of one frame. The read loop's
//! pong replies and the feeder's part/join lines therefore never
//! interleave, and a writer that finds the slot taken suspends until it is
//! free.

use skipvote_proto::{ClientCommand, IrcWriter, WsError};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::Mutex;
use tracing::trace;

use crate::error::SessionError;

pub struct SessionWriter<S> {
    inner: Mutex<IrcWriter<S>>,
}

impl<S> SessionWriter<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(writer: IrcWriter<S>) -> Self {
        Self {
            inner: Mutex::new(writer),
        }
    }

    pub async fn send(&self, command: &ClientCommand) -> Result<(), SessionError> {
        let mut writer = self.inner.lock().await;
        trace!(command = command.name(), "Sending");
        writer.send(command).await.map_err(SessionError::Write)
    }

    /// Start the WebSocket close handshake.
    pub async fn close(&self) -> Result<(), WsError> {
        self.inner.lock().await.close().await
    }
}
