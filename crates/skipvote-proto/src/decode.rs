//! Incremental decoder for the chat line protocol.
//!
//! [`decode`] looks at the not-yet-consumed bytes of a read buffer and
//! reports at most one message plus the number of bytes it covered. It never
//! fails: a buffer that does not hold a complete line yet is reported as
//! `(None, 0)` and the caller must append more data before retrying.
//!
//! # Example
//!
//! ```
//! use skipvote_proto::decode;
//!
//! let raw = b"@badges=subscriber/1 :foo!foo@x PRIVMSG #c :-voteskip\r\n";
//! let (msg, consumed) = decode(raw);
//! let msg = msg.unwrap();
//!
//! assert!(msg.is_sub);
//! assert_eq!(msg.user_str(), "foo");
//! assert_eq!(msg.content_str(), "-voteskip");
//! assert_eq!(consumed, raw.len());
//! ```

use std::borrow::Cow;

use crate::message::{ChatMessage, InboundMessage};

/// Line terminator used by the chat service.
pub const CRLF: &[u8] = b"\r\n";

/// The only chat command the decoder reports.
pub const PRIVMSG: &[u8] = b"PRIVMSG";

const PING: &[u8] = b"PING :";
const BADGES_KEY: &[u8] = b"badges";
const SUBSCRIBER_BADGE: &[u8] = b"subscriber";

/// A decoded message borrowing from the caller's read buffer.
///
/// The borrow ties every `IrcMessage` to the buffer it was decoded from, so
/// the buffer cannot be advanced or grown while one is alive. Callers that
/// need the data afterwards copy it out with [`IrcMessage::to_inbound`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IrcMessage<'a> {
    /// Sender carried a `subscriber` badge in the `badges` tag.
    pub is_sub: bool,
    /// Message is a server `PING`.
    pub is_ping: bool,
    /// Sender nickname from the prefix, empty if absent.
    pub user: &'a [u8],
    /// Chat payload, or the ping token for pings.
    pub content: &'a [u8],
}

impl<'a> IrcMessage<'a> {
    /// Sender nickname as text.
    pub fn user_str(&self) -> Cow<'a, str> {
        String::from_utf8_lossy(self.user)
    }

    /// Payload as text.
    pub fn content_str(&self) -> Cow<'a, str> {
        String::from_utf8_lossy(self.content)
    }

    /// Copy the message into owned storage.
    pub fn to_inbound(&self) -> InboundMessage {
        if self.is_ping {
            InboundMessage::Ping {
                token: self.content_str().into_owned(),
            }
        } else {
            InboundMessage::Chat(ChatMessage {
                user: self.user_str().into_owned(),
                content: self.content_str().into_owned(),
                is_sub: self.is_sub,
            })
        }
    }
}

const NEED_MORE_DATA: (Option<IrcMessage<'static>>, usize) = (None, 0);

/// Decode the first message in `buffer`.
///
/// Returns:
/// - `(None, 0)` when `buffer` does not contain a complete line yet;
/// - `(None, n)` with `n > 0` when a complete line carried nothing actionable
///   (any command other than `PRIVMSG` and `PING`);
/// - `(Some(msg), n)` for a chat message or a ping.
///
/// One read commonly carries several lines, so callers re-invoke `decode` on
/// the remainder until it reports `0` consumed bytes.
pub fn decode(buffer: &[u8]) -> (Option<IrcMessage<'_>>, usize) {
    let mut rest = buffer;
    let mut consumed = 0;
    let mut msg = IrcMessage::default();

    if rest.is_empty() {
        return NEED_MORE_DATA;
    }

    if rest[0] == b'@' {
        let Some(space) = find_byte(rest, b' ') else {
            return NEED_MORE_DATA;
        };
        msg.is_sub = has_subscriber_badge(&rest[1..space]);
        consumed += space + 1;
        rest = &rest[space + 1..];
    }

    if rest.is_empty() {
        return NEED_MORE_DATA;
    }

    if rest[0] == b':' {
        let Some(space) = find_byte(rest, b' ') else {
            return NEED_MORE_DATA;
        };
        let prefix = &rest[1..space];
        if let Some(excl) = find_byte(prefix, b'!') {
            msg.user = &prefix[..excl];
        }
        consumed += space + 1;
        rest = &rest[space + 1..];
    }

    if rest.is_empty() {
        return NEED_MORE_DATA;
    }

    let Some(crlf) = find_subslice(rest, CRLF) else {
        return NEED_MORE_DATA;
    };
    consumed += crlf + CRLF.len();
    let line = &rest[..crlf];

    if !line.starts_with(PRIVMSG) {
        if line.starts_with(PING) {
            msg.is_ping = true;
            msg.content = &line[PING.len()..];
            return (Some(msg), consumed);
        }
        return (None, consumed);
    }

    if let Some(colon) = find_byte(line, b':') {
        msg.content = &line[colon + 1..];
    }
    (Some(msg), consumed)
}

/// `true` if the `badges` tag value lists a subscriber badge.
fn has_subscriber_badge(tags: &[u8]) -> bool {
    tags.split(|&b| b == b';')
        .filter_map(|tag| {
            let eq = find_byte(tag, b'=')?;
            (&tag[..eq] == BADGES_KEY).then(|| &tag[eq + 1..])
        })
        .any(|value| find_subslice(value, SUBSCRIBER_BADGE).is_some())
}

fn find_byte(haystack: &[u8], needle: u8) -> Option<usize> {
    haystack.iter().position(|&b| b == needle)
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
