//! Operator console.
//!
//! Reads commands line by line from stdin and drives the same interfaces a
//! settings panel would: rule edits go to the [`RulesChannel`] (and are
//! queued for saving), vote controls go to the vote actor. Vote
//! notifications are printed as they arrive.

use std::io::BufRead;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::rules::{Rules, RulesChannel};
use crate::store::SaveQueue;
use crate::votes::{VoteHandle, VoteNotification};

const HELP: &str = "\
commands:
  channel [name]      join a channel (no name leaves the current one)
  command <keyword>   set the vote keyword
  subs on|off         allow subscribers to vote
  nonsubs on|off      allow non-subscribers to vote
  threshold <n>       votes needed to skip
  toggle | enable | disable
  reset               clear the current votes
  status              show rules and vote count
  help
  quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Channel(String),
    Command(String),
    Subs(bool),
    NonSubs(bool),
    Threshold(usize),
    Toggle,
    Enable,
    Disable,
    Reset,
    Status,
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("unknown command '{0}', try 'help'")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
}

/// Parse one input line. Blank lines yield `None`.
pub fn parse(line: &str) -> Result<Option<ConsoleCommand>, ParseError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word.to_ascii_lowercase().as_str() {
        "channel" => {
            let name = rest.strip_prefix('#').unwrap_or(rest);
            if name.contains(char::is_whitespace) {
                return Err(ParseError::Usage("channel [name]"));
            }
            ConsoleCommand::Channel(name.to_string())
        }
        "command" if !rest.is_empty() => ConsoleCommand::Command(rest.to_string()),
        "command" => return Err(ParseError::Usage("command <keyword>")),
        "subs" => ConsoleCommand::Subs(parse_switch(rest).ok_or(ParseError::Usage("subs on|off"))?),
        "nonsubs" => ConsoleCommand::NonSubs(
            parse_switch(rest).ok_or(ParseError::Usage("nonsubs on|off"))?,
        ),
        "threshold" => ConsoleCommand::Threshold(
            rest.parse()
                .map_err(|_| ParseError::Usage("threshold <n>"))?,
        ),
        "toggle" => ConsoleCommand::Toggle,
        "enable" => ConsoleCommand::Enable,
        "disable" => ConsoleCommand::Disable,
        "reset" => ConsoleCommand::Reset,
        "status" => ConsoleCommand::Status,
        "help" | "?" => ConsoleCommand::Help,
        "quit" | "exit" => ConsoleCommand::Quit,
        other => return Err(ParseError::Unknown(other.to_string())),
    };
    Ok(Some(command))
}

fn parse_switch(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "on" | "yes" | "true" | "1" => Some(true),
        "off" | "no" | "false" | "0" => Some(false),
        _ => None,
    }
}

pub struct Console {
    rules: Arc<RulesChannel>,
    votes: VoteHandle,
    saves: SaveQueue,
}

impl Console {
    pub fn new(rules: Arc<RulesChannel>, votes: VoteHandle, saves: SaveQueue) -> Self {
        Self {
            rules,
            votes,
            saves,
        }
    }

    /// Carry out a command. Returns text to show the operator, if any;
    /// vote controls answer through notifications instead.
    pub async fn apply(&self, command: ConsoleCommand) -> Option<String> {
        match command {
            ConsoleCommand::Channel(name) => {
                self.edit_rules(|r| r.channel = name.clone());
                Some(if name.is_empty() {
                    "channel cleared".to_string()
                } else {
                    format!("channel set to #{name}")
                })
            }
            ConsoleCommand::Command(keyword) => {
                self.edit_rules(|r| r.command = keyword.clone());
                Some(format!("vote command set to '{keyword}'"))
            }
            ConsoleCommand::Subs(allow) => {
                self.edit_rules(|r| r.allow_subs = allow);
                Some(format!("subscriber votes {}", on_off(allow)))
            }
            ConsoleCommand::NonSubs(allow) => {
                self.edit_rules(|r| r.allow_non_subs = allow);
                Some(format!("non-subscriber votes {}", on_off(allow)))
            }
            ConsoleCommand::Threshold(threshold) => {
                let rules = self.edit_rules(|r| r.threshold = threshold);
                self.votes.threshold_changed(rules.threshold).await;
                Some(format!("threshold set to {}", rules.threshold))
            }
            ConsoleCommand::Toggle => {
                self.votes.toggle().await;
                None
            }
            ConsoleCommand::Enable => {
                self.votes.set_enabled(true).await;
                None
            }
            ConsoleCommand::Disable => {
                self.votes.set_enabled(false).await;
                None
            }
            ConsoleCommand::Reset => {
                self.votes.reset().await;
                None
            }
            ConsoleCommand::Status => Some(self.status()),
            ConsoleCommand::Help => Some(HELP.to_string()),
            ConsoleCommand::Quit => None,
        }
    }

    fn edit_rules(&self, edit: impl FnOnce(&mut Rules)) -> Rules {
        let rules = self.rules.update(true, edit);
        self.saves.queue();
        rules
    }

    fn status(&self) -> String {
        let rules = self.rules.read();
        let votes = self.votes.status();
        format!(
            "channel: #{}\ncommand: '{}'\nsubs: {}, non-subs: {}\nvotes: {}/{} ({})",
            rules.channel,
            rules.command,
            on_off(rules.allow_subs),
            on_off(rules.allow_non_subs),
            votes.count,
            rules.threshold,
            if votes.enabled { "enabled" } else { "disabled" },
        )
    }

    pub fn describe(&self, notification: &VoteNotification) -> String {
        match notification {
            VoteNotification::CountChanged(count) => {
                format!("votes: {count}/{}", self.rules.read().threshold)
            }
            VoteNotification::ThresholdReached { voters } => {
                format!("{voters} votes reached, skipping")
            }
            VoteNotification::Reset => "votes reset".to_string(),
            VoteNotification::EnabledChanged(true) => "voting enabled".to_string(),
            VoteNotification::EnabledChanged(false) => "voting disabled".to_string(),
        }
    }
}

fn on_off(value: bool) -> &'static str {
    if value { "on" } else { "off" }
}

/// Read stdin on a dedicated thread and forward each line.
///
/// The returned receiver closes when stdin reaches end of file.
pub fn stdin_lines() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(16);
    let spawned = std::thread::Builder::new()
        .name("console-stdin".into())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.blocking_send(line).is_err() {
                    break;
                }
            }
        });
    if let Err(e) = spawned {
        warn!(error = %e, "Failed to start console input thread");
    }
    rx
}

/// Run the console until `quit` or shutdown.
///
/// End of input only stops reading commands; notifications keep printing.
pub async fn run(
    console: Console,
    mut lines: mpsc::Receiver<String>,
    mut notifications: broadcast::Receiver<VoteNotification>,
    shutdown: CancellationToken,
) {
    let mut input_open = true;
    println!("type 'help' for commands");

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            line = lines.recv(), if input_open => {
                let Some(line) = line else {
                    debug!("Console input closed");
                    input_open = false;
                    continue;
                };
                match parse(&line) {
                    Ok(Some(ConsoleCommand::Quit)) => {
                        shutdown.cancel();
                        break;
                    }
                    Ok(Some(command)) => {
                        if let Some(reply) = console.apply(command).await {
                            println!("{reply}");
                        }
                    }
                    Ok(None) => {}
                    Err(e) => println!("{e}"),
                }
            }
            note = notifications.recv() => match note {
                Ok(note) => println!("{}", console.describe(&note)),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Console fell behind on vote notifications");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuator::LogActuator;
    use crate::store::{RulesStore, spawn_saver};
    use crate::votes::VoteActor;
    use std::time::Duration;

    #[test]
    fn test_parse_rule_edits() {
        assert_eq!(
            parse("channel #Forsen").unwrap(),
            Some(ConsoleCommand::Channel("Forsen".into()))
        );
        assert_eq!(
            parse("channel").unwrap(),
            Some(ConsoleCommand::Channel(String::new()))
        );
        assert_eq!(
            parse("command  !skip song ").unwrap(),
            Some(ConsoleCommand::Command("!skip song".into()))
        );
        assert_eq!(parse("SUBS off").unwrap(), Some(ConsoleCommand::Subs(false)));
        assert_eq!(parse("nonsubs on").unwrap(), Some(ConsoleCommand::NonSubs(true)));
        assert_eq!(
            parse("threshold 0").unwrap(),
            Some(ConsoleCommand::Threshold(0))
        );
    }

    #[test]
    fn test_parse_controls_and_errors() {
        assert_eq!(parse("   ").unwrap(), None);
        assert_eq!(parse("toggle").unwrap(), Some(ConsoleCommand::Toggle));
        assert_eq!(parse("exit").unwrap(), Some(ConsoleCommand::Quit));
        assert_eq!(
            parse("threshold lots"),
            Err(ParseError::Usage("threshold <n>"))
        );
        assert_eq!(parse("subs maybe"), Err(ParseError::Usage("subs on|off")));
        assert_eq!(parse("command"), Err(ParseError::Usage("command <keyword>")));
        assert_eq!(parse("skip"), Err(ParseError::Unknown("skip".into())));
    }

    #[tokio::test]
    async fn test_apply_edits_rules_with_notification() {
        let dir = tempfile::tempdir().unwrap();
        let rules = Arc::new(RulesChannel::new(Rules::default()));
        let (votes, _notes) = VoteActor::spawn(Arc::new(LogActuator), true);
        let shutdown = CancellationToken::new();
        let (saves, _task) = spawn_saver(
            RulesStore::new(dir.path().join("rules.toml")),
            rules.clone(),
            Duration::from_secs(60),
            shutdown.clone(),
        );
        let console = Console::new(rules.clone(), votes, saves);

        console
            .apply(ConsoleCommand::Channel("xqc".into()))
            .await
            .unwrap();
        let reply = console.apply(ConsoleCommand::Threshold(0)).await.unwrap();

        assert_eq!(reply, "threshold set to 1");
        assert_eq!(rules.read().channel, "xqc");
        assert_eq!(rules.read().threshold, 1);

        let mut sub = rules.subscribe().await;
        assert!(sub.try_changed());
        assert!(!sub.try_changed());
        shutdown.cancel();
    }
}
