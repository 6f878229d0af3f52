//! Core configuration types and loading.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use super::defaults::*;
use crate::rules::Rules;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Client configuration.
///
/// Every section is optional; an empty file yields the built-in defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Chat service endpoint.
    pub endpoint: Endpoint,
    /// Login identity and capability negotiation.
    pub identity: IdentityConfig,
    /// TLS verification and connect deadline.
    pub tls: TlsConfig,
    /// Inbound buffering limits.
    pub limits: LimitsConfig,
    /// Reconnect backoff policy.
    pub reconnect: ReconnectConfig,
    /// Initial vote rules, used when the rules store has nothing saved.
    pub rules: Rules,
    /// Rules persistence.
    pub store: StoreConfig,
    /// Skip actuator.
    pub actuator: ActuatorConfig,
    /// Logging.
    pub log: LogConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

/// Where the chat service lives.
#[derive(Debug, Clone, Deserialize)]
pub struct Endpoint {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Request target for the WebSocket upgrade.
    #[serde(default = "default_path")]
    pub path: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for Endpoint {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            path: default_path(),
            user_agent: default_user_agent(),
        }
    }
}

impl Endpoint {
    /// The `wss://` URL used for the upgrade request.
    pub fn url(&self) -> String {
        format!("wss://{}:{}{}", self.host, self.port, self.path)
    }
}

/// Login identity sent during session initialisation.
///
/// The defaults are the anonymous read-only login the chat service accepts.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
    #[serde(default = "default_nick")]
    pub nick: String,
    #[serde(default = "default_password")]
    pub password: String,
    /// Capabilities requested with `CAP REQ`. Empty skips the request.
    #[serde(default = "default_capabilities")]
    pub capabilities: Vec<String>,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            nick: default_nick(),
            password: default_password(),
            capabilities: default_capabilities(),
        }
    }
}

/// TLS verification settings.
#[derive(Debug, Clone, Deserialize)]
pub struct TlsConfig {
    /// Deadline for resolve + TCP + TLS + upgrade, in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Check server certificates against `crl_paths`.
    #[serde(default = "default_check_revocation")]
    pub check_revocation: bool,
    /// PEM files holding certificate revocation lists.
    #[serde(default)]
    pub crl_paths: Vec<PathBuf>,
    /// Accept certificates whose revocation status the CRLs do not cover.
    #[serde(default)]
    pub allow_unknown_revocation: bool,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout(),
            check_revocation: default_check_revocation(),
            crl_paths: Vec::new(),
            allow_unknown_revocation: false,
        }
    }
}

impl TlsConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Inbound buffering limits.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Largest amount of undecoded text held before the session is ended.
    #[serde(default = "default_max_buffer_bytes")]
    pub max_buffer_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_buffer_bytes: default_max_buffer_bytes(),
        }
    }
}

/// Reconnect backoff policy.
///
/// Delays double from `initial_backoff_ms` up to `max_backoff_ms` with up to
/// 50% added jitter. After `max_consecutive_failures` the supervisor waits
/// `cooldown_secs` and starts over.
#[derive(Debug, Clone, Deserialize)]
pub struct ReconnectConfig {
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: u32,
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,
    /// A session that lasted at least this long resets the backoff.
    #[serde(default = "default_stable_after_secs")]
    pub stable_after_secs: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            max_consecutive_failures: default_max_consecutive_failures(),
            cooldown_secs: default_cooldown_secs(),
            stable_after_secs: default_stable_after_secs(),
        }
    }
}

impl ReconnectConfig {
    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    pub fn stable_after(&self) -> Duration {
        Duration::from_secs(self.stable_after_secs)
    }
}

/// Rules persistence.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
    /// Quiet period after an edit before the rules are written out.
    #[serde(default = "default_save_debounce_ms")]
    pub save_debounce_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            save_debounce_ms: default_save_debounce_ms(),
        }
    }
}

impl StoreConfig {
    pub fn save_debounce(&self) -> Duration {
        Duration::from_millis(self.save_debounce_ms)
    }
}

/// Skip actuator.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActuatorConfig {
    /// Program and arguments run when a vote passes. Empty only logs.
    #[serde(default)]
    pub command: Vec<String>,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging configuration. `RUST_LOG` overrides `level` when set.
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}
