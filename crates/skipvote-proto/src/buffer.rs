//! Bounded accumulation buffer driving the decoder.

use bytes::{Buf, BytesMut};

use crate::decode::decode;
use crate::error::ProtocolError;
use crate::message::InboundMessage;

/// Default bound on bytes buffered without a complete line.
pub const DEFAULT_MAX_BUFFER_LEN: usize = 64 * 1024;

/// Accumulates incoming frames and hands out decoded messages.
///
/// Frames are appended verbatim; a line may span any number of frames and a
/// frame may hold any number of lines. The buffer is only advanced by the
/// byte count the decoder reported, after the message has been copied out.
#[derive(Debug)]
pub struct FrameBuffer {
    buffer: BytesMut,
    max_len: usize,
}

impl FrameBuffer {
    /// Create a buffer that fails once more than `max_len` bytes are pending
    /// without a line terminator.
    pub fn new(max_len: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(8192),
            max_len,
        }
    }

    /// Append raw bytes from the network.
    pub fn push(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Decode the next actionable message.
    ///
    /// Non-actionable lines are skipped. Returns `Ok(None)` once the buffer
    /// needs more data, or [`ProtocolError::MessageTooLong`] if the pending
    /// remainder has outgrown the bound.
    pub fn next_message(&mut self) -> Result<Option<InboundMessage>, ProtocolError> {
        loop {
            let (msg, consumed) = decode(&self.buffer);
            if consumed == 0 {
                if self.buffer.len() > self.max_len {
                    return Err(ProtocolError::MessageTooLong {
                        actual: self.buffer.len(),
                        limit: self.max_len,
                    });
                }
                return Ok(None);
            }

            let owned = msg.map(|m| m.to_inbound());
            self.buffer.advance(consumed);
            if owned.is_some() {
                return Ok(owned);
            }
        }
    }

    /// Bytes buffered but not yet decoded.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// `true` if nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_BUFFER_LEN)
    }
}
