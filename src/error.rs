//! Unified error handling for skipvote.
//!
//! Every failure a chat session can hit is a [`SessionError`]. None of them
//! are fatal to the process: the supervisor logs the error, ends the
//! session and starts a fresh one.

use skipvote_proto::{ProtocolError, WsError};
use std::io;
use std::time::Duration;
use thiserror::Error;
use tokio_rustls::rustls;

// ============================================================================
// Session Errors
// ============================================================================

/// Errors that end a chat session.
#[derive(Debug, Error)]
#[allow(clippy::large_enum_variant)] // WsError is large but these are rare
pub enum SessionError {
    #[error("failed to resolve {host}:{port}: {source}")]
    Resolve {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    #[error("no addresses found for {0}")]
    NoAddress(String),

    #[error("failed to connect: {0}")]
    Connect(#[source] io::Error),

    #[error("invalid server name: {0}")]
    InvalidServerName(#[from] rustls::pki_types::InvalidDnsNameError),

    #[error("TLS handshake failed: {0}")]
    Tls(#[source] io::Error),

    #[error("invalid upgrade request: {0}")]
    InvalidRequest(String),

    #[error("WebSocket upgrade failed: {0}")]
    Upgrade(#[source] WsError),

    #[error("connect phase did not finish within {0:?}")]
    ConnectTimeout(Duration),

    #[error("read failed: {0}")]
    Read(#[source] WsError),

    #[error("write failed: {0}")]
    Write(#[source] WsError),

    /// The peer sent more unterminated text than the buffer allows.
    #[error("inbound buffer overflow: {0}")]
    BufferOverflow(#[source] ProtocolError),
}

impl SessionError {
    /// Get a static error code string for log labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Resolve { .. } => "resolve_failed",
            Self::NoAddress(_) => "no_address",
            Self::Connect(_) => "connect_failed",
            Self::InvalidServerName(_) => "invalid_server_name",
            Self::Tls(_) => "tls_failed",
            Self::InvalidRequest(_) => "invalid_request",
            Self::Upgrade(_) => "upgrade_failed",
            Self::ConnectTimeout(_) => "connect_timeout",
            Self::Read(_) => "read_failed",
            Self::Write(_) => "write_failed",
            Self::BufferOverflow(_) => "buffer_overflow",
        }
    }

    /// Whether the error happened before the WebSocket was established.
    pub fn is_connect_phase(&self) -> bool {
        !matches!(
            self,
            Self::Read(_) | Self::Write(_) | Self::BufferOverflow(_)
        )
    }
}

// ============================================================================
// TLS Setup Errors
// ============================================================================

/// Errors building the TLS client configuration at startup.
#[derive(Debug, Error)]
pub enum TlsSetupError {
    #[error("no usable root certificates found")]
    NoRootCertificates,

    #[error("failed to read CRL file {path}: {source}")]
    CrlRead {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("no CRLs found in {0}")]
    EmptyCrl(String),

    #[error("revocation checking is enabled but tls.crl_paths is empty")]
    NoCrls,

    #[error("failed to build certificate verifier: {0}")]
    Verifier(#[from] rustls::client::VerifierBuilderError),
}
