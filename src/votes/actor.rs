//! Vote actor.
//!
//! Owns the [`VoteAggregator`] and serializes every mutation through one
//! mpsc queue. Sessions submit classified chat messages; the console
//! submits toggle, reset and threshold edits. Results go out as
//! [`VoteNotification`]s on a broadcast channel, and the current
//! [`VoteStatus`] is readable at any time through a watch channel.

use std::sync::Arc;

use skipvote_proto::ChatMessage;
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, info, warn};

use super::aggregator::{VoteAggregator, VoteOutcome};
use crate::actuator::SkipActuator;
use crate::rules::Rules;

const COMMAND_QUEUE: usize = 256;
const NOTIFICATION_QUEUE: usize = 64;

/// Input to the vote actor.
#[derive(Debug)]
pub enum VoteCommand {
    /// A chat message, with the rules snapshot it was received under.
    Message {
        message: ChatMessage,
        rules: Arc<Rules>,
    },
    Toggle,
    SetEnabled(bool),
    Reset,
    ThresholdChanged(usize),
}

/// Output of the vote actor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoteNotification {
    CountChanged(usize),
    /// A skip was requested after `voters` distinct votes.
    ThresholdReached { voters: usize },
    Reset,
    EnabledChanged(bool),
}

/// Snapshot for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteStatus {
    pub count: usize,
    pub enabled: bool,
}

/// Cloneable sender side of the vote actor.
#[derive(Debug, Clone)]
pub struct VoteHandle {
    tx: mpsc::Sender<VoteCommand>,
    status: watch::Receiver<VoteStatus>,
}

impl VoteHandle {
    pub async fn submit(&self, message: ChatMessage, rules: Arc<Rules>) {
        self.send(VoteCommand::Message { message, rules }).await;
    }

    pub async fn toggle(&self) {
        self.send(VoteCommand::Toggle).await;
    }

    pub async fn set_enabled(&self, enabled: bool) {
        self.send(VoteCommand::SetEnabled(enabled)).await;
    }

    pub async fn reset(&self) {
        self.send(VoteCommand::Reset).await;
    }

    pub async fn threshold_changed(&self, threshold: usize) {
        self.send(VoteCommand::ThresholdChanged(threshold)).await;
    }

    /// Latest published status. Never blocks the actor.
    pub fn status(&self) -> VoteStatus {
        *self.status.borrow()
    }

    async fn send(&self, command: VoteCommand) {
        if self.tx.send(command).await.is_err() {
            warn!("Vote actor has stopped, dropping command");
        }
    }
}

pub struct VoteActor {
    aggregator: VoteAggregator,
    actuator: Arc<dyn SkipActuator>,
    notify: broadcast::Sender<VoteNotification>,
    status: watch::Sender<VoteStatus>,
}

impl VoteActor {
    /// Spawn the actor.
    ///
    /// The notification receiver is handed out here and only here; there is
    /// no way to register a second consumer later.
    pub fn spawn(
        actuator: Arc<dyn SkipActuator>,
        enabled: bool,
    ) -> (VoteHandle, broadcast::Receiver<VoteNotification>) {
        let (tx, rx) = mpsc::channel(COMMAND_QUEUE);
        let (notify, notifications) = broadcast::channel(NOTIFICATION_QUEUE);
        let (status_tx, status_rx) = watch::channel(VoteStatus { count: 0, enabled });

        let actor = Self {
            aggregator: VoteAggregator::new(enabled),
            actuator,
            notify,
            status: status_tx,
        };

        tokio::spawn(async move {
            actor.run(rx).await;
        });

        (
            VoteHandle {
                tx,
                status: status_rx,
            },
            notifications,
        )
    }

    /// The main actor loop. Ends once every handle is dropped.
    pub async fn run(mut self, mut rx: mpsc::Receiver<VoteCommand>) {
        while let Some(command) = rx.recv().await {
            self.handle_command(command);
        }
        debug!("Vote actor stopped");
    }

    fn handle_command(&mut self, command: VoteCommand) {
        match command {
            VoteCommand::Message { message, rules } => {
                match self.aggregator.on_message(&message, &rules) {
                    VoteOutcome::Counted(count) => {
                        debug!(user = %message.user, count, threshold = rules.threshold, "Vote counted");
                        self.emit(VoteNotification::CountChanged(count));
                    }
                    VoteOutcome::ThresholdReached(voters) => {
                        info!(user = %message.user, voters, "Vote threshold reached");
                        self.emit(VoteNotification::ThresholdReached { voters });
                        self.emit(VoteNotification::CountChanged(0));
                        self.trigger_skip();
                    }
                    VoteOutcome::Disabled | VoteOutcome::Ignored | VoteOutcome::Duplicate => {}
                }
            }
            VoteCommand::Toggle => {
                let enabled = self.aggregator.toggle();
                info!(enabled, "Voting toggled");
                self.emit(VoteNotification::EnabledChanged(enabled));
            }
            VoteCommand::SetEnabled(enabled) => {
                if self.aggregator.set_enabled(enabled) {
                    info!(enabled, "Voting enabled state changed");
                    self.emit(VoteNotification::EnabledChanged(enabled));
                }
            }
            VoteCommand::Reset => {
                self.aggregator.reset();
                info!("Votes reset");
                self.emit(VoteNotification::Reset);
                self.emit(VoteNotification::CountChanged(0));
            }
            VoteCommand::ThresholdChanged(threshold) => {
                if self.aggregator.apply_threshold(threshold) {
                    info!(threshold, "Votes reset by threshold change");
                    self.emit(VoteNotification::Reset);
                    self.emit(VoteNotification::CountChanged(0));
                }
            }
        }

        self.status.send_replace(VoteStatus {
            count: self.aggregator.count(),
            enabled: self.aggregator.is_enabled(),
        });
    }

    fn emit(&self, notification: VoteNotification) {
        // No receiver just means nobody is watching.
        let _ = self.notify.send(notification);
    }

    fn trigger_skip(&self) {
        let actuator = self.actuator.clone();
        tokio::spawn(async move {
            match actuator.skip().await {
                Ok(()) => info!("Skipped current media"),
                Err(e) => warn!(error = %e, "Skip failed"),
            }
        });
    }
}
