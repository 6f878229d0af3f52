//! Owned message types handed out of the read path.

/// A chat message copied out of the read buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatMessage {
    /// Sender nickname, empty if the line had no user prefix.
    pub user: String,
    /// Text after the command's payload colon.
    pub content: String,
    /// Sender carried a subscriber badge.
    pub is_sub: bool,
}

/// A message the client has to act on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InboundMessage {
    /// Server keepalive; must be answered with a `PONG` carrying `token`.
    Ping {
        /// Token to echo back.
        token: String,
    },
    /// A `PRIVMSG` in the joined channel.
    Chat(ChatMessage),
}
