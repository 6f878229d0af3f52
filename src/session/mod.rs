//! Chat session: one connection from connect to teardown.
//!
//! A session:
//! 1. connects ([`Connector::connect`]),
//! 2. sends the login sequence and joins the configured channel,
//! 3. runs the read loop and the reconfiguration feeder side by side on the
//!    current task until the stream ends, fails, or shutdown is requested,
//! 4. tears down: cancels its lifetime token and closes the stream if it is
//!    still open.
//!
//! Sessions never retry. The supervisor starts a new one.

mod connect;
mod feeder;
mod writer;

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use skipvote_proto::{ClientCommand, InboundMessage, IrcReader, TransportReadError};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::WebSocketStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

pub use self::connect::{ChatStream, Connector};
pub use self::writer::SessionWriter;
use crate::config::IdentityConfig;
use crate::error::SessionError;
use crate::rules::RulesChannel;
use crate::votes::VoteHandle;

/// Upper bound on the close handshake during teardown.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared handles every session needs. Built once by the composition root.
#[derive(Clone)]
pub struct SessionContext {
    pub rules: Arc<RulesChannel>,
    pub votes: VoteHandle,
    pub identity: IdentityConfig,
    pub max_buffer_bytes: usize,
}

/// How an established session ended.
#[derive(Debug)]
pub enum SessionEnd {
    /// The server closed the stream.
    Closed,
    /// The process is shutting down.
    Shutdown,
    /// A read, write or buffer error ended the session.
    Failed(SessionError),
}

/// Per-connection state touched by both the read loop and the feeder.
///
/// Only locked for short synchronous sections, never across an await.
#[derive(Debug)]
struct SessionState {
    last_channel: String,
}

pub(crate) struct Session<'a, S> {
    ctx: &'a SessionContext,
    writer: SessionWriter<S>,
    state: Mutex<SessionState>,
    lifetime: CancellationToken,
    failure: Mutex<Option<SessionError>>,
}

/// Connect and run one session to completion.
///
/// Returns `Err` when the session never got past connecting and logging in.
#[instrument(skip_all, fields(host = %connector.endpoint().host))]
pub async fn run(
    connector: &Connector,
    ctx: &SessionContext,
    shutdown: &CancellationToken,
) -> Result<SessionEnd, SessionError> {
    let stream = tokio::select! {
        result = connector.connect() => result?,
        _ = shutdown.cancelled() => return Ok(SessionEnd::Shutdown),
    };
    drive(stream, ctx, shutdown).await
}

/// Run a session over an already-upgraded stream.
pub async fn drive<S>(
    stream: WebSocketStream<S>,
    ctx: &SessionContext,
    shutdown: &CancellationToken,
) -> Result<SessionEnd, SessionError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (writer, mut reader) = skipvote_proto::split(stream, ctx.max_buffer_bytes);

    // Claim the change signal before reading the rules, so an edit made
    // during login is seen by the feeder.
    let mut changes = ctx.rules.subscribe().await;
    changes.try_changed();

    let session = Session::new(ctx, SessionWriter::new(writer));
    if let Err(e) = session.initialize().await {
        session.teardown(&reader).await;
        return Err(e);
    }

    let read_loop = async {
        let end = session.listen(&mut reader, shutdown).await;
        session.lifetime.cancel();
        end
    };
    let (end, ()) = tokio::join!(read_loop, session.feed(&mut changes));

    session.teardown(&reader).await;
    Ok(end)
}

impl<'a, S> Session<'a, S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    fn new(ctx: &'a SessionContext, writer: SessionWriter<S>) -> Self {
        Self {
            ctx,
            writer,
            state: Mutex::new(SessionState {
                last_channel: String::new(),
            }),
            lifetime: CancellationToken::new(),
            failure: Mutex::new(None),
        }
    }

    /// Send the login sequence and join the configured channel.
    async fn initialize(&self) -> Result<(), SessionError> {
        let identity = &self.ctx.identity;
        if !identity.capabilities.is_empty() {
            self.writer
                .send(&ClientCommand::CapReq(identity.capabilities.clone()))
                .await?;
        }
        self.writer
            .send(&ClientCommand::Pass(identity.password.clone()))
            .await?;
        self.writer
            .send(&ClientCommand::Nick(identity.nick.clone()))
            .await?;

        let channel = self.ctx.rules.snapshot().channel.clone();
        if !channel.is_empty() {
            self.writer.send(&ClientCommand::Join(channel.clone())).await?;
            info!(channel = %channel, "Joined channel");
            self.state.lock().last_channel = channel;
        }
        Ok(())
    }

    /// The read loop: answer pings, hand chat to the vote actor.
    async fn listen(&self, reader: &mut IrcReader<S>, shutdown: &CancellationToken) -> SessionEnd {
        loop {
            let next = tokio::select! {
                next = reader.next() => next,
                _ = shutdown.cancelled() => {
                    debug!("Session cancelled by shutdown");
                    return SessionEnd::Shutdown;
                }
                _ = self.lifetime.cancelled() => {
                    return match self.failure.lock().take() {
                        Some(e) => SessionEnd::Failed(e),
                        None => SessionEnd::Closed,
                    };
                }
            };

            match next {
                None => {
                    info!("Server closed the connection");
                    return SessionEnd::Closed;
                }
                Some(Err(TransportReadError::Protocol(e))) => {
                    return SessionEnd::Failed(SessionError::BufferOverflow(e));
                }
                Some(Err(TransportReadError::WebSocket(e))) => {
                    return SessionEnd::Failed(SessionError::Read(e));
                }
                Some(Ok(InboundMessage::Ping { token })) => {
                    debug!(token = %token, "PING");
                    if let Err(e) = self.writer.send(&ClientCommand::Pong(token)).await {
                        return SessionEnd::Failed(e);
                    }
                }
                Some(Ok(InboundMessage::Chat(message))) => {
                    // Rules as of arrival, not as of the feeder's last wakeup.
                    let rules = self.ctx.rules.snapshot();
                    self.ctx.votes.submit(message, rules).await;
                }
            }
        }
    }

    /// Record a feeder failure and end the session.
    fn fail(&self, error: SessionError) {
        self.failure.lock().get_or_insert(error);
        self.lifetime.cancel();
    }

    /// Cancel the lifetime and close the stream if the peer has not.
    /// Never fails; close errors are only logged.
    async fn teardown(&self, reader: &IrcReader<S>) {
        self.lifetime.cancel();
        if reader.is_closed() {
            return;
        }
        match tokio::time::timeout(CLOSE_TIMEOUT, self.writer.close()).await {
            Ok(Ok(())) => debug!("Connection closed"),
            Ok(Err(e)) => debug!(error = %e, "Close handshake failed"),
            Err(_) => debug!("Close handshake timed out"),
        }
    }
}
