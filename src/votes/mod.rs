//! Vote aggregation.

pub mod actor;
pub mod aggregator;

pub use actor::{VoteActor, VoteCommand, VoteHandle, VoteNotification, VoteStatus};
pub use aggregator::{VoteAggregator, VoteOutcome};
