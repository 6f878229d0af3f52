//! Error types for the chat protocol library.

use thiserror::Error;

/// Protocol-level errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProtocolError {
    /// Buffered bytes without a line terminator exceeded the allowed size.
    #[error("message too long: {actual} bytes buffered (limit: {limit})")]
    MessageTooLong {
        /// Bytes currently buffered.
        actual: usize,
        /// Maximum allowed length.
        limit: usize,
    },
}
