//! # skipvote-proto
//!
//! Protocol layer for the skipvote chat client: an incremental decoder for
//! the line-oriented chat protocol, the handful of client commands the
//! client sends, and a WebSocket transport that carries both.
//!
//! ## Features
//!
//! - [`decode`]: zero-allocation decoding that tolerates arbitrary fragmentation
//! - [`FrameBuffer`]: bounded accumulation buffer driving the decode loop
//! - [`ClientCommand`]: CRLF-terminated client lines
//! - Optional Tokio integration: [`transport::split`] into reader/writer halves
//!
//! ## Decoding
//!
//! ```rust
//! use skipvote_proto::{FrameBuffer, InboundMessage};
//!
//! let mut buf = FrameBuffer::default();
//! buf.push(b"PING :tmi.tw");
//! assert!(buf.next_message().unwrap().is_none());
//!
//! buf.push(b"itch.tv\r\n");
//! assert_eq!(
//!     buf.next_message().unwrap(),
//!     Some(InboundMessage::Ping { token: "tmi.twitch.tv".into() })
//! );
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod buffer;
pub mod command;
pub mod decode;
pub mod error;
pub mod message;

#[cfg(feature = "tokio")]
pub mod transport;

pub use self::buffer::{FrameBuffer, DEFAULT_MAX_BUFFER_LEN};
pub use self::command::ClientCommand;
pub use self::decode::{decode, IrcMessage};
pub use self::error::ProtocolError;
pub use self::message::{ChatMessage, InboundMessage};

#[cfg(feature = "tokio")]
pub use self::transport::{split, IrcReader, IrcWriter, TransportReadError};

#[cfg(feature = "tokio")]
pub use tokio_tungstenite::tungstenite::Error as WsError;
