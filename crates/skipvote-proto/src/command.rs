//! Client-to-server commands.
//!
//! Every command serializes to exactly one CRLF-terminated line.

use std::fmt::{self, Display, Formatter};

/// Commands the client sends.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClientCommand {
    /// `CAP REQ :<caps...>` capability request.
    CapReq(Vec<String>),
    /// `PASS <password>` credential line.
    Pass(String),
    /// `NICK <nick>` identity line.
    Nick(String),
    /// `JOIN #<channel>`.
    Join(String),
    /// `PART #<channel>`.
    Part(String),
    /// `PONG :<token>` keepalive reply.
    Pong(String),
}

impl ClientCommand {
    /// The command verb, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CapReq(_) => "CAP",
            Self::Pass(_) => "PASS",
            Self::Nick(_) => "NICK",
            Self::Join(_) => "JOIN",
            Self::Part(_) => "PART",
            Self::Pong(_) => "PONG",
        }
    }
}

impl Display for ClientCommand {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::CapReq(caps) => write!(f, "CAP REQ :{}\r\n", caps.join(" ")),
            Self::Pass(password) => write!(f, "PASS {password}\r\n"),
            Self::Nick(nick) => write!(f, "NICK {nick}\r\n"),
            Self::Join(channel) => write!(f, "JOIN #{channel}\r\n"),
            Self::Part(channel) => write!(f, "PART #{channel}\r\n"),
            Self::Pong(token) => write!(f, "PONG :{token}\r\n"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_lines() {
        assert_eq!(
            ClientCommand::CapReq(vec!["twitch.tv/tags".into()]).to_string(),
            "CAP REQ :twitch.tv/tags\r\n"
        );
        assert_eq!(
            ClientCommand::CapReq(vec!["twitch.tv/tags".into(), "twitch.tv/commands".into()])
                .to_string(),
            "CAP REQ :twitch.tv/tags twitch.tv/commands\r\n"
        );
        assert_eq!(ClientCommand::Pass("oauth:".into()).to_string(), "PASS oauth:\r\n");
        assert_eq!(
            ClientCommand::Nick("justinfan12345".into()).to_string(),
            "NICK justinfan12345\r\n"
        );
        assert_eq!(ClientCommand::Join("c".into()).to_string(), "JOIN #c\r\n");
        assert_eq!(ClientCommand::Part("c".into()).to_string(), "PART #c\r\n");
        assert_eq!(
            ClientCommand::Pong("tmi.twitch.tv".into()).to_string(),
            "PONG :tmi.twitch.tv\r\n"
        );
    }

    #[test]
    fn test_names() {
        assert_eq!(ClientCommand::Join("c".into()).name(), "JOIN");
        assert_eq!(ClientCommand::Pong(String::new()).name(), "PONG");
    }
}
