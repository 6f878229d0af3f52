//! Integration test common infrastructure.
//!
//! Provides a fake chat server and a harness wiring a session to real
//! rules and vote actors with a recording actuator.

pub mod server;

use std::sync::Arc;

use async_trait::async_trait;
use skipvote::actuator::{ActuatorError, SkipActuator};
use skipvote::config::IdentityConfig;
use skipvote::rules::{Rules, RulesChannel};
use skipvote::error::SessionError;
use skipvote::session::{self, SessionContext, SessionEnd};
use skipvote::votes::{VoteActor, VoteNotification};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_tungstenite::WebSocketStream;
use tokio_util::sync::CancellationToken;

#[allow(unused_imports)]
pub use server::{FakeServer, breakable_pair, pair};

/// Counts skips instead of touching any media player.
pub struct RecordingActuator(mpsc::UnboundedSender<()>);

#[async_trait]
impl SkipActuator for RecordingActuator {
    async fn skip(&self) -> Result<(), ActuatorError> {
        let _ = self.0.send(());
        Ok(())
    }
}

/// Shared handles for one test.
#[allow(dead_code)]
pub struct Harness {
    pub ctx: SessionContext,
    pub rules: Arc<RulesChannel>,
    pub notifications: broadcast::Receiver<VoteNotification>,
    pub skips: mpsc::UnboundedReceiver<()>,
}

impl Harness {
    pub fn new(rules: Rules) -> Self {
        Self::with_buffer(rules, 64 * 1024)
    }

    pub fn with_buffer(rules: Rules, max_buffer_bytes: usize) -> Self {
        let rules = Arc::new(RulesChannel::new(rules));
        let (skip_tx, skips) = mpsc::unbounded_channel();
        let (votes, notifications) = VoteActor::spawn(Arc::new(RecordingActuator(skip_tx)), true);
        Self {
            ctx: SessionContext {
                rules: rules.clone(),
                votes,
                identity: IdentityConfig::default(),
                max_buffer_bytes,
            },
            rules,
            notifications,
            skips,
        }
    }
}

/// Rules for `channel` with a given threshold.
#[allow(dead_code)]
pub fn rules(channel: &str, threshold: usize) -> Rules {
    Rules {
        channel: channel.to_string(),
        threshold,
        ..Rules::default()
    }
}

/// Run a session over `client` on its own task.
#[allow(dead_code)]
pub fn spawn_session<S>(
    harness: &Harness,
    client: WebSocketStream<S>,
    shutdown: &CancellationToken,
) -> JoinHandle<Result<SessionEnd, SessionError>>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let ctx = harness.ctx.clone();
    let shutdown = shutdown.clone();
    tokio::spawn(async move { session::drive(client, &ctx, &shutdown).await })
}

/// Consume the login sequence up to and including the JOIN.
#[allow(dead_code)]
pub async fn expect_login(server: &mut FakeServer, channel: &str) -> anyhow::Result<()> {
    anyhow::ensure!(server.recv_line().await? == "CAP REQ :twitch.tv/tags\r\n");
    anyhow::ensure!(server.recv_line().await? == "PASS oauth:\r\n");
    anyhow::ensure!(server.recv_line().await? == "NICK justinfan12345\r\n");
    if !channel.is_empty() {
        let join = server.recv_line().await?;
        anyhow::ensure!(join == format!("JOIN #{channel}\r\n"), "unexpected join: {join:?}");
    }
    Ok(())
}
