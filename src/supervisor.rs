//! Reconnect supervisor.
//!
//! Runs sessions back to back for as long as the process lives. Between
//! sessions it waits according to [`Backoff`]: exponential growth with
//! jitter, and a long cooldown after too many consecutive failures. It
//! always tries again afterwards.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, error, info, info_span, warn};

use crate::config::ReconnectConfig;
use crate::error::SessionError;
use crate::session::{self, Connector, SessionContext, SessionEnd};

/// What to do before the next attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pause {
    Retry(Duration),
    /// The failure policy tripped; the counter has been cleared.
    Cooldown(Duration),
}

impl Pause {
    pub fn duration(self) -> Duration {
        match self {
            Pause::Retry(d) | Pause::Cooldown(d) => d,
        }
    }
}

/// Exponential backoff with jitter and a sustained-failure cooldown.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    cooldown: Duration,
    max_failures: u32,
    current: Duration,
    failures: u32,
}

impl Backoff {
    pub fn new(config: &ReconnectConfig) -> Self {
        let initial = config.initial_backoff().max(Duration::from_millis(1));
        Self {
            initial,
            max: config.max_backoff().max(initial),
            cooldown: config.cooldown(),
            max_failures: config.max_consecutive_failures.max(1),
            current: initial,
            failures: 0,
        }
    }

    /// Consecutive failures since the last reset or cooldown.
    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn record_failure(&mut self) {
        self.failures = self.failures.saturating_add(1);
    }

    /// A healthy session: start over from the initial delay.
    pub fn reset(&mut self) {
        self.failures = 0;
        self.current = self.initial;
    }

    /// Delay before the next attempt, advancing the exponential state.
    pub fn next_pause<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Pause {
        if self.failures >= self.max_failures {
            self.reset();
            return Pause::Cooldown(self.cooldown);
        }

        let base = self.current;
        self.current = (self.current * 2).min(self.max);

        let spread = u64::try_from(base.as_millis() / 2).unwrap_or(u64::MAX);
        let jitter = Duration::from_millis(rng.gen_range(0..=spread));
        Pause::Retry(base + jitter)
    }
}

/// Runs one session to completion. The supervisor's only view of a session.
#[async_trait]
pub trait SessionRunner: Send + Sync {
    async fn run_session(&self, shutdown: &CancellationToken) -> Result<SessionEnd, SessionError>;
}

/// Live chat sessions over the configured endpoint.
pub struct ChatSessions {
    connector: Connector,
    ctx: SessionContext,
}

impl ChatSessions {
    pub fn new(connector: Connector, ctx: SessionContext) -> Self {
        Self { connector, ctx }
    }
}

#[async_trait]
impl SessionRunner for ChatSessions {
    async fn run_session(&self, shutdown: &CancellationToken) -> Result<SessionEnd, SessionError> {
        session::run(&self.connector, &self.ctx, shutdown).await
    }
}

pub struct Supervisor<R> {
    runner: R,
    policy: ReconnectConfig,
    shutdown: CancellationToken,
}

impl<R: SessionRunner> Supervisor<R> {
    pub fn new(runner: R, policy: ReconnectConfig, shutdown: CancellationToken) -> Self {
        Self {
            runner,
            policy,
            shutdown,
        }
    }

    /// Run sessions until shutdown is requested.
    pub async fn run(self) {
        let mut backoff = Backoff::new(&self.policy);
        let stable_after = self.policy.stable_after();
        let mut attempt: u64 = 0;

        while !self.shutdown.is_cancelled() {
            attempt += 1;
            let started = Instant::now();
            let result = self
                .runner
                .run_session(&self.shutdown)
                .instrument(info_span!("session", attempt))
                .await;

            match result {
                Ok(SessionEnd::Shutdown) => break,
                Ok(end) => {
                    let lasted = started.elapsed();
                    if let SessionEnd::Failed(e) = &end {
                        warn!(attempt, error = %e, code = e.error_code(), "Session ended");
                    }
                    if lasted >= stable_after {
                        backoff.reset();
                    } else {
                        warn!(attempt, ?lasted, "Session ended before it was stable");
                        backoff.record_failure();
                    }
                }
                Err(e) => {
                    warn!(
                        attempt,
                        error = %e,
                        code = e.error_code(),
                        connecting = e.is_connect_phase(),
                        "Session failed"
                    );
                    backoff.record_failure();
                }
            }

            let failures = backoff.failures();
            let pause = backoff.next_pause(&mut rand::thread_rng());
            match pause {
                Pause::Cooldown(d) => error!(
                    attempts = attempt,
                    failures,
                    cooldown = ?d,
                    "Too many consecutive connection failures, cooling down"
                ),
                Pause::Retry(d) => info!(delay = ?d, failures, "Reconnecting"),
            }

            tokio::select! {
                _ = tokio::time::sleep(pause.duration()) => {}
                _ = self.shutdown.cancelled() => break,
            }
        }

        info!("Supervisor stopped");
    }
}
