//! Default value functions for configuration.
//!
//! Separated into its own module for clarity and reuse.

use std::path::PathBuf;

// =============================================================================
// Endpoint Defaults
// =============================================================================

pub fn default_host() -> String {
    "irc-ws.chat.twitch.tv".to_string()
}

pub fn default_port() -> u16 {
    443
}

pub fn default_path() -> String {
    "/".to_string()
}

pub fn default_user_agent() -> String {
    format!("skipvote/{}", env!("CARGO_PKG_VERSION"))
}

// =============================================================================
// Identity Defaults
// =============================================================================

pub fn default_nick() -> String {
    "justinfan12345".to_string()
}

pub fn default_password() -> String {
    "oauth:".to_string()
}

pub fn default_capabilities() -> Vec<String> {
    vec!["twitch.tv/tags".to_string()]
}

// =============================================================================
// TLS / Limits Defaults
// =============================================================================

pub fn default_connect_timeout() -> u64 {
    30
}

pub fn default_check_revocation() -> bool {
    true
}

pub fn default_max_buffer_bytes() -> usize {
    skipvote_proto::DEFAULT_MAX_BUFFER_LEN
}

// =============================================================================
// Reconnect Defaults
// =============================================================================

pub fn default_initial_backoff_ms() -> u64 {
    500
}

pub fn default_max_backoff_ms() -> u64 {
    60_000
}

pub fn default_max_consecutive_failures() -> u32 {
    10
}

pub fn default_cooldown_secs() -> u64 {
    300
}

pub fn default_stable_after_secs() -> u64 {
    10
}

// =============================================================================
// Store Defaults
// =============================================================================

pub fn default_store_path() -> PathBuf {
    PathBuf::from("skipvote-rules.toml")
}

pub fn default_save_debounce_ms() -> u64 {
    1000
}

// =============================================================================
// Log Defaults
// =============================================================================

pub fn default_log_level() -> String {
    "info".to_string()
}
