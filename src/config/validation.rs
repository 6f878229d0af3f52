//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::Config;
use std::path::PathBuf;
use thiserror::Error;

/// Smallest accepted inbound buffer; a single chat line must fit.
const MIN_BUFFER_BYTES: usize = 512;

/// Validation errors for configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("endpoint.host is required")]
    MissingHost,
    #[error("endpoint.port must be non-zero")]
    InvalidPort,
    #[error("endpoint.path must start with '/', got '{0}'")]
    InvalidPath(String),
    #[error("endpoint.user_agent contains characters not allowed in a header")]
    InvalidUserAgent,
    #[error("identity.nick is required")]
    MissingNick,
    #[error("tls.connect_timeout_secs must be non-zero")]
    InvalidConnectTimeout,
    #[error("tls.crl_paths is empty; list CRL files or set tls.check_revocation = false")]
    MissingCrls,
    #[error("tls.crl_paths entry does not exist: {0}")]
    CrlNotFound(PathBuf),
    #[error("limits.max_buffer_bytes must be at least {MIN_BUFFER_BYTES}, got {0}")]
    BufferTooSmall(usize),
    #[error("reconnect.initial_backoff_ms must be between 1 and max_backoff_ms ({max}), got {initial}")]
    InvalidBackoff { initial: u64, max: u64 },
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    // Endpoint
    if config.endpoint.host.is_empty() {
        errors.push(ValidationError::MissingHost);
    }
    if config.endpoint.port == 0 {
        errors.push(ValidationError::InvalidPort);
    }
    if !config.endpoint.path.starts_with('/') {
        errors.push(ValidationError::InvalidPath(config.endpoint.path.clone()));
    }
    if config
        .endpoint
        .user_agent
        .bytes()
        .any(|b| b.is_ascii_control() || !b.is_ascii())
    {
        errors.push(ValidationError::InvalidUserAgent);
    }

    if config.identity.nick.is_empty() {
        errors.push(ValidationError::MissingNick);
    }

    // TLS
    if config.tls.connect_timeout_secs == 0 {
        errors.push(ValidationError::InvalidConnectTimeout);
    }
    if config.tls.check_revocation && config.tls.crl_paths.is_empty() {
        errors.push(ValidationError::MissingCrls);
    }
    for path in &config.tls.crl_paths {
        if !path.exists() {
            errors.push(ValidationError::CrlNotFound(path.clone()));
        }
    }

    if config.limits.max_buffer_bytes < MIN_BUFFER_BYTES {
        errors.push(ValidationError::BufferTooSmall(
            config.limits.max_buffer_bytes,
        ));
    }

    let reconnect = &config.reconnect;
    if reconnect.initial_backoff_ms == 0 || reconnect.initial_backoff_ms > reconnect.max_backoff_ms
    {
        errors.push(ValidationError::InvalidBackoff {
            initial: reconnect.initial_backoff_ms,
            max: reconnect.max_backoff_ms,
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
