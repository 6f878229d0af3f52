//! Media skip actuator.
//!
//! The vote actor calls [`SkipActuator::skip`] once per threshold crossing.
//! The call is best effort: its result is logged and nothing else.

use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tracing::info;

use crate::config::ActuatorConfig;

#[derive(Debug, Error)]
pub enum ActuatorError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}")]
    Failed {
        program: String,
        status: std::process::ExitStatus,
    },
}

/// Something that skips the currently playing media.
#[async_trait]
pub trait SkipActuator: Send + Sync {
    async fn skip(&self) -> Result<(), ActuatorError>;
}

/// Build the actuator described by `config`.
pub fn from_config(config: &ActuatorConfig) -> Arc<dyn SkipActuator> {
    match config.command.split_first() {
        Some((program, args)) => Arc::new(CommandActuator::new(program.clone(), args.to_vec())),
        None => Arc::new(LogActuator),
    }
}

/// Runs an external program, e.g. `playerctl next`.
#[derive(Debug, Clone)]
pub struct CommandActuator {
    program: String,
    args: Vec<String>,
}

impl CommandActuator {
    pub fn new(program: String, args: Vec<String>) -> Self {
        Self { program, args }
    }
}

#[async_trait]
impl SkipActuator for CommandActuator {
    async fn skip(&self) -> Result<(), ActuatorError> {
        let status = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|source| ActuatorError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(ActuatorError::Failed {
                program: self.program.clone(),
                status,
            })
        }
    }
}

/// Only logs. Used when no command is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogActuator;

#[async_trait]
impl SkipActuator for LogActuator {
    async fn skip(&self) -> Result<(), ActuatorError> {
        info!("Skip requested (no actuator command configured)");
        Ok(())
    }
}
