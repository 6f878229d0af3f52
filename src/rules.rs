//! Vote rules and the channel that shares them across tasks.
//!
//! [`RulesChannel`] holds the live [`Rules`] snapshot behind a short
//! `parking_lot` critical section plus a capacity-1 change signal. Posting
//! to a full signal is dropped, so any burst of writes wakes the session
//! feeder at most once.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use skipvote_proto::ChatMessage;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{MutexGuard, mpsc};

/// The live configuration that decides which chat messages count as votes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rules {
    /// Prefix a message must start with to count.
    pub command: String,
    /// Channel to join, without the leading `#`. Empty means none.
    pub channel: String,
    pub allow_subs: bool,
    pub allow_non_subs: bool,
    /// Distinct voters needed to trigger a skip. Always at least 1 once
    /// normalised.
    pub threshold: usize,
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            command: "-voteskip".to_string(),
            channel: "nerixyz".to_string(),
            allow_subs: true,
            allow_non_subs: true,
            threshold: 42,
        }
    }
}

impl Rules {
    /// Clamp the threshold to 1 and reduce the channel to a single token
    /// without a leading `#`.
    ///
    /// The channel is written into JOIN/PART lines, so whitespace and
    /// control characters are dropped wherever the value came from.
    pub fn normalized(mut self) -> Self {
        self.threshold = self.threshold.max(1);
        self.channel.retain(|c| !c.is_whitespace() && !c.is_control());
        if let Some(stripped) = self.channel.strip_prefix('#') {
            self.channel = stripped.to_string();
        }
        self
    }

    /// Whether `message` is a vote under these rules.
    pub fn qualifies(&self, message: &ChatMessage) -> bool {
        let allowed = (self.allow_subs && message.is_sub) || (self.allow_non_subs && !message.is_sub);
        allowed && message.content.starts_with(&self.command)
    }
}

/// Shared rules snapshot with a coalesced change notification.
#[derive(Debug)]
pub struct RulesChannel {
    rules: Mutex<Arc<Rules>>,
    changed_tx: mpsc::Sender<()>,
    changed_rx: tokio::sync::Mutex<mpsc::Receiver<()>>,
}

impl RulesChannel {
    /// Seed the channel without posting a change.
    pub fn new(initial: Rules) -> Self {
        let (changed_tx, changed_rx) = mpsc::channel(1);
        Self {
            rules: Mutex::new(Arc::new(initial.normalized())),
            changed_tx,
            changed_rx: tokio::sync::Mutex::new(changed_rx),
        }
    }

    /// Copy of the current rules.
    pub fn read(&self) -> Rules {
        self.rules.lock().as_ref().clone()
    }

    /// Shared handle on the current rules. Later writes do not affect it.
    pub fn snapshot(&self) -> Arc<Rules> {
        self.rules.lock().clone()
    }

    /// Replace the rules and, if `notify`, post a change signal.
    ///
    /// Never blocks: a signal that is already pending absorbs this one.
    pub fn write(&self, rules: Rules, notify: bool) {
        *self.rules.lock() = Arc::new(rules.normalized());
        if notify {
            // Full means a signal is already pending; the receiver lives in
            // `self`, so Closed cannot happen.
            if let Err(TrySendError::Full(())) = self.changed_tx.try_send(()) {
                tracing::trace!("Rules change coalesced");
            }
        }
    }

    /// Apply `edit` to a copy of the current rules and write the result.
    pub fn update(&self, notify: bool, edit: impl FnOnce(&mut Rules)) -> Rules {
        let mut rules = self.read();
        edit(&mut rules);
        let rules = rules.normalized();
        self.write(rules.clone(), notify);
        rules
    }

    /// Claim the change signal.
    ///
    /// Only one subscriber can hold it at a time; a later session's feeder
    /// waits here until the previous one is dropped.
    pub async fn subscribe(&self) -> RulesSubscription<'_> {
        RulesSubscription {
            rx: self.changed_rx.lock().await,
        }
    }
}

/// Exclusive handle on the change signal of a [`RulesChannel`].
pub struct RulesSubscription<'a> {
    rx: MutexGuard<'a, mpsc::Receiver<()>>,
}

impl RulesSubscription<'_> {
    /// Wait for the next change signal.
    pub async fn changed(&mut self) {
        // The sender lives in the channel that outlives this guard.
        let _ = self.rx.recv().await;
    }

    /// Take a pending signal without waiting.
    pub fn try_changed(&mut self) -> bool {
        self.rx.try_recv().is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn chat(content: &str, is_sub: bool) -> ChatMessage {
        ChatMessage {
            user: "viewer".into(),
            content: content.into(),
            is_sub,
        }
    }

    #[test]
    fn test_qualifies_requires_prefix() {
        let rules = Rules::default();
        assert!(rules.qualifies(&chat("-voteskip", false)));
        assert!(rules.qualifies(&chat("-voteskip please", true)));
        assert!(!rules.qualifies(&chat("voteskip", false)));
        assert!(!rules.qualifies(&chat(" -voteskip", false)));
    }

    #[test]
    fn test_qualifies_respects_sub_gates() {
        let subs_only = Rules {
            allow_non_subs: false,
            ..Rules::default()
        };
        assert!(subs_only.qualifies(&chat("-voteskip", true)));
        assert!(!subs_only.qualifies(&chat("-voteskip", false)));

        let nobody = Rules {
            allow_subs: false,
            allow_non_subs: false,
            ..Rules::default()
        };
        assert!(!nobody.qualifies(&chat("-voteskip", true)));
        assert!(!nobody.qualifies(&chat("-voteskip", false)));
    }

    #[test]
    fn test_normalized_clamps_threshold_and_strips_hash() {
        let rules = Rules {
            channel: "#forsen".into(),
            threshold: 0,
            ..Rules::default()
        }
        .normalized();
        assert_eq!(rules.channel, "forsen");
        assert_eq!(rules.threshold, 1);
    }

    #[test]
    fn test_normalized_channel_cannot_carry_extra_lines() {
        let rules = Rules {
            channel: " #a\r\nPRIVMSG #x :hi\u{0}".into(),
            ..Rules::default()
        }
        .normalized();
        assert_eq!(rules.channel, "aPRIVMSG#x:hi");
    }

    #[test]
    fn test_deserialize_fills_missing_fields() {
        let rules: Rules = toml::from_str("channel = \"xqc\"").unwrap();
        assert_eq!(rules.channel, "xqc");
        assert_eq!(rules.command, "-voteskip");
        assert_eq!(rules.threshold, 42);
    }

    #[tokio::test]
    async fn test_burst_of_writes_coalesces_into_one_signal() {
        let channel = RulesChannel::new(Rules::default());
        for threshold in 1..=10 {
            channel.update(true, |r| r.threshold = threshold);
        }

        let mut sub = channel.subscribe().await;
        assert!(sub.try_changed());
        assert!(!sub.try_changed());
        assert_eq!(channel.read().threshold, 10);
    }

    #[test]
    fn test_snapshot_sees_latest_write_only_when_taken_after() {
        let channel = RulesChannel::new(Rules {
            threshold: 3,
            ..Rules::default()
        });
        let before = channel.snapshot();
        channel.update(false, |r| r.threshold = 10);

        assert_eq!(before.threshold, 3);
        assert_eq!(channel.snapshot().threshold, 10);
    }

    #[tokio::test]
    async fn test_write_without_notify_is_silent() {
        let channel = RulesChannel::new(Rules::default());
        channel.write(
            Rules {
                channel: "other".into(),
                ..Rules::default()
            },
            false,
        );

        let mut sub = channel.subscribe().await;
        assert!(!sub.try_changed());
        assert_eq!(channel.read().channel, "other");
    }

    #[tokio::test]
    async fn test_changed_wakes_on_write() {
        let channel = Arc::new(RulesChannel::new(Rules::default()));
        let writer = channel.clone();
        let waiter = tokio::spawn(async move {
            let mut sub = channel.subscribe().await;
            sub.changed().await;
            channel.read().channel
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        writer.update(true, |r| r.channel = "new".into());

        let seen = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(seen, "new");
    }
}
