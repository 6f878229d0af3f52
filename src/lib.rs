//! skipvote - chat-driven vote-to-skip client.
//!
//! Keeps a TLS WebSocket connection to a chat service open indefinitely,
//! counts distinct voters in the configured channel, and skips the playing
//! media once enough of them have voted. The binary in `main.rs` wires the
//! pieces together; they are exposed here for integration tests.

pub mod actuator;
pub mod config;
pub mod console;
pub mod error;
pub mod rules;
pub mod session;
pub mod store;
pub mod supervisor;
pub mod telemetry;
pub mod votes;
