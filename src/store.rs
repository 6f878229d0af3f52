//! Rules persistence.
//!
//! Rules are kept in a small TOML file. Edits are saved by a background
//! task after a quiet period, and once more at shutdown.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::rules::{Rules, RulesChannel};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access rules file: {0}")]
    Io(#[from] io::Error),
    #[error("failed to parse rules file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize rules: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Debug, Clone)]
pub struct RulesStore {
    path: PathBuf,
}

impl RulesStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the saved rules.
    ///
    /// A missing file yields `defaults`. So does an unreadable one, with a
    /// warning; the next save overwrites it.
    pub fn load(&self, defaults: &Rules) -> Rules {
        match self.try_load() {
            Ok(Some(rules)) => {
                info!(path = %self.path.display(), "Loaded saved rules");
                rules.normalized()
            }
            Ok(None) => defaults.clone().normalized(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Ignoring saved rules");
                defaults.clone().normalized()
            }
        }
    }

    fn try_load(&self) -> Result<Option<Rules>, StoreError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(toml::from_str(&content)?))
    }

    /// Write `rules` via a temporary file and rename.
    pub fn save(&self, rules: &Rules) -> Result<(), StoreError> {
        let content = toml::to_string_pretty(rules)?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), "Saved rules");
        Ok(())
    }
}

/// Handle for queueing a debounced save.
#[derive(Debug, Clone)]
pub struct SaveQueue {
    tx: mpsc::Sender<()>,
}

impl SaveQueue {
    /// Ask for a save. Requests made while one is pending collapse into it.
    pub fn queue(&self) {
        let _ = self.tx.try_send(());
    }
}

/// Spawn the background saver.
///
/// After each request it waits `debounce`, then writes whatever the rules
/// are at that moment. It stops when `shutdown` is cancelled; the final
/// save is left to the caller.
pub fn spawn_saver(
    store: RulesStore,
    rules: Arc<RulesChannel>,
    debounce: Duration,
    shutdown: CancellationToken,
) -> (SaveQueue, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel::<()>(1);

    let task = tokio::spawn(async move {
        loop {
            tokio::select! {
                request = rx.recv() => {
                    if request.is_none() {
                        break;
                    }
                }
                _ = shutdown.cancelled() => break,
            }

            tokio::select! {
                _ = tokio::time::sleep(debounce) => {}
                _ = shutdown.cancelled() => break,
            }
            // Requests that arrived during the wait are covered by this save.
            while rx.try_recv().is_ok() {}

            if let Err(e) = store.save(&rules.read()) {
                warn!(path = %store.path().display(), error = %e, "Failed to save rules");
            }
        }
        debug!("Rules saver stopped");
    });

    (SaveQueue { tx }, task)
}
