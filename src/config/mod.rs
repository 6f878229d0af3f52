//! Configuration loading and management.
//!
//! This module is split into logical submodules:
//! - [`types`]: config struct definitions (Config, Endpoint, TlsConfig, ...)
//! - [`defaults`]: serde default value functions
//! - [`validation`]: startup validation collecting every error found

mod defaults;
mod types;
pub mod validation;

pub use types::{
    ActuatorConfig, Config, ConfigError, Endpoint, IdentityConfig, LimitsConfig, LogConfig,
    LogFormat, ReconnectConfig, StoreConfig, TlsConfig,
};
pub use validation::{ValidationError, validate};
