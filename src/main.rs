//! skipvote - chat-driven vote-to-skip client.

use std::path::Path;
use std::sync::Arc;

use skipvote::config::{self, Config};
use skipvote::console::{self, Console};
use skipvote::rules::RulesChannel;
use skipvote::session::{Connector, SessionContext};
use skipvote::store::{self, RulesStore};
use skipvote::supervisor::{ChatSessions, Supervisor};
use skipvote::votes::VoteActor;
use skipvote::{actuator, telemetry};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration; a missing default file means built-in defaults.
    let config_path = std::env::args().nth(1);
    let config = match &config_path {
        Some(path) => Config::load(path)?,
        None if Path::new("skipvote.toml").exists() => Config::load("skipvote.toml")?,
        None => Config::default(),
    };

    telemetry::init(&config.log);

    if let Err(errors) = config::validate(&config) {
        for e in &errors {
            error!(error = %e, "Invalid configuration");
        }
        anyhow::bail!("configuration has {} error(s)", errors.len());
    }

    info!(
        endpoint = %config.endpoint.url(),
        config = config_path.as_deref().unwrap_or("skipvote.toml"),
        "Starting skipvote"
    );

    // Rules: saved file first, config as the fallback.
    let store = RulesStore::new(&config.store.path);
    let rules = Arc::new(RulesChannel::new(store.load(&config.rules)));
    info!(channel = %rules.read().channel, threshold = rules.read().threshold, "Rules loaded");

    let actuator = actuator::from_config(&config.actuator);
    let (votes, notifications) = VoteActor::spawn(actuator, true);

    let shutdown = CancellationToken::new();
    let connector = Connector::new(config.endpoint.clone(), &config.tls)?;
    let ctx = SessionContext {
        rules: rules.clone(),
        votes: votes.clone(),
        identity: config.identity.clone(),
        max_buffer_bytes: config.limits.max_buffer_bytes,
    };

    let supervisor = tokio::spawn(
        Supervisor::new(
            ChatSessions::new(connector, ctx),
            config.reconnect.clone(),
            shutdown.clone(),
        )
        .run(),
    );

    let (saves, saver) = store::spawn_saver(
        store.clone(),
        rules.clone(),
        config.store.save_debounce(),
        shutdown.clone(),
    );
    let console = tokio::spawn(console::run(
        Console::new(rules.clone(), votes, saves),
        console::stdin_lines(),
        notifications,
        shutdown.clone(),
    ));

    tokio::select! {
        result = tokio::signal::ctrl_c() => match result {
            Ok(()) => info!("Shutdown requested"),
            Err(e) => {
                warn!(error = %e, "Failed to listen for Ctrl-C, use 'quit' to stop");
                shutdown.cancelled().await;
            }
        },
        _ = shutdown.cancelled() => info!("Quit requested"),
    }
    shutdown.cancel();

    for (name, task) in [("supervisor", supervisor), ("console", console), ("saver", saver)] {
        if let Err(e) = task.await {
            warn!(task = name, error = %e, "Task did not finish cleanly");
        }
    }

    if let Err(e) = store.save(&rules.read()) {
        error!(path = %store.path().display(), error = %e, "Failed to save rules");
    }

    info!("Shutdown complete");
    Ok(())
}
