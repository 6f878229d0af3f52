//! Vote counting.
//!
//! [`VoteAggregator`] is plain data with no locking. The vote actor owns
//! the only instance, which gives it a single writer.

use std::collections::HashSet;

use skipvote_proto::ChatMessage;

use crate::rules::Rules;

/// What a chat message did to the vote set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    /// Voting is disabled.
    Disabled,
    /// The message is not a vote under the current rules.
    Ignored,
    /// The sender already voted in this cycle.
    Duplicate,
    /// A new voter was counted.
    Counted(usize),
    /// This voter reached the threshold; the set has been cleared.
    ThresholdReached(usize),
}

/// Distinct-voter set with an enable gate.
#[derive(Debug)]
pub struct VoteAggregator {
    voters: HashSet<String>,
    enabled: bool,
}

impl Default for VoteAggregator {
    fn default() -> Self {
        Self::new(true)
    }
}

impl VoteAggregator {
    pub fn new(enabled: bool) -> Self {
        Self {
            voters: HashSet::new(),
            enabled,
        }
    }

    /// Classify `message` under `rules` and count it if it is a new vote.
    pub fn on_message(&mut self, message: &ChatMessage, rules: &Rules) -> VoteOutcome {
        if !self.enabled {
            return VoteOutcome::Disabled;
        }
        if !rules.qualifies(message) {
            return VoteOutcome::Ignored;
        }
        if !self.voters.insert(message.user.clone()) {
            return VoteOutcome::Duplicate;
        }

        let count = self.voters.len();
        if count >= rules.threshold.max(1) {
            self.voters.clear();
            VoteOutcome::ThresholdReached(count)
        } else {
            VoteOutcome::Counted(count)
        }
    }

    /// Clear the vote set. Returns `false` if it was already empty.
    pub fn reset(&mut self) -> bool {
        let had_votes = !self.voters.is_empty();
        self.voters.clear();
        had_votes
    }

    /// React to a threshold edit. The count is cleared, without triggering
    /// a skip, when it already meets the new threshold.
    pub fn apply_threshold(&mut self, threshold: usize) -> bool {
        if !self.voters.is_empty() && self.voters.len() >= threshold.max(1) {
            self.voters.clear();
            true
        } else {
            false
        }
    }

    /// Flip the enable gate and return the new state.
    pub fn toggle(&mut self) -> bool {
        self.enabled = !self.enabled;
        self.enabled
    }

    /// Set the enable gate. Returns `true` if the state changed.
    pub fn set_enabled(&mut self, enabled: bool) -> bool {
        let changed = self.enabled != enabled;
        self.enabled = enabled;
        changed
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn count(&self) -> usize {
        self.voters.len()
    }
}
