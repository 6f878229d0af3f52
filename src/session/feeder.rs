//! Reconfiguration feeder.
//!
//! Runs next to the read loop for the whole session. On each change signal,
//! when the channel differs from the one last joined, the feeder parts the
//! old channel before joining the new one.

use skipvote_proto::ClientCommand;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info};

use super::Session;
use crate::error::SessionError;
use crate::rules::RulesSubscription;

impl<S> Session<'_, S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Apply rule changes until the session lifetime is cancelled.
    pub(super) async fn feed(&self, changes: &mut RulesSubscription<'_>) {
        loop {
            tokio::select! {
                biased;
                _ = self.lifetime.cancelled() => {
                    debug!("Feeder stopped");
                    return;
                }
                _ = changes.changed() => {}
            }

            let rules = self.ctx.rules.snapshot();
            let previous = self.state.lock().last_channel.clone();

            if previous == rules.channel {
                debug!("Rules changed, channel unchanged");
                continue;
            }

            if let Err(e) = self.switch_channel(&previous, &rules.channel).await {
                self.fail(e);
                return;
            }
            self.state.lock().last_channel = rules.channel.clone();
        }
    }

    async fn switch_channel(&self, previous: &str, next: &str) -> Result<(), SessionError> {
        if !previous.is_empty() {
            self.writer
                .send(&ClientCommand::Part(previous.to_string()))
                .await?;
            info!(channel = %previous, "Left channel");
        }
        if !next.is_empty() {
            self.writer.send(&ClientCommand::Join(next.to_string())).await?;
            info!(channel = %next, "Joined channel");
        }
        Ok(())
    }
}
