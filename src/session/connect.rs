//! Connect phase: resolve, TCP, TLS, WebSocket upgrade.
//!
//! The whole phase runs under one deadline. Server certificates are checked
//! against the configured CRLs; turning that off must be explicit.

use std::fs::File;
use std::io::BufReader;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpStream, lookup_host};
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;
use tokio_rustls::rustls::client::WebPkiServerVerifier;
use tokio_rustls::rustls::pki_types::{CertificateRevocationListDer, ServerName};
use tokio_rustls::rustls::{ClientConfig, RootCertStore};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::USER_AGENT;
use tracing::{debug, info, warn};

use crate::config::{Endpoint, TlsConfig};
use crate::error::{SessionError, TlsSetupError};

/// The upgraded stream a live session runs over.
pub type ChatStream = WebSocketStream<TlsStream<TcpStream>>;

/// Everything needed to open a connection to the fixed endpoint.
///
/// Built once at startup; every session reuses the same TLS configuration.
#[derive(Clone)]
pub struct Connector {
    endpoint: Endpoint,
    tls: TlsConnector,
    timeout: Duration,
}

impl Connector {
    pub fn new(endpoint: Endpoint, tls: &TlsConfig) -> Result<Self, TlsSetupError> {
        let config = client_config(tls)?;
        Ok(Self {
            endpoint,
            tls: TlsConnector::from(Arc::new(config)),
            timeout: tls.connect_timeout(),
        })
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Open a new upgraded stream, or fail within the connect deadline.
    pub async fn connect(&self) -> Result<ChatStream, SessionError> {
        tokio::time::timeout(self.timeout, self.establish())
            .await
            .map_err(|_| SessionError::ConnectTimeout(self.timeout))?
    }

    async fn establish(&self) -> Result<ChatStream, SessionError> {
        let Endpoint { host, port, .. } = &self.endpoint;

        let addrs: Vec<SocketAddr> = lookup_host((host.as_str(), *port))
            .await
            .map_err(|source| SessionError::Resolve {
                host: host.clone(),
                port: *port,
                source,
            })?
            .collect();
        debug!(host = %host, count = addrs.len(), "Resolved endpoint");

        let tcp = connect_any(host, &addrs).await?;
        if let Err(e) = tcp.set_nodelay(true) {
            debug!(error = %e, "Failed to set TCP_NODELAY");
        }

        let server_name = ServerName::try_from(host.clone())?;
        let tls = self
            .tls
            .connect(server_name, tcp)
            .await
            .map_err(SessionError::Tls)?;
        debug!(host = %host, "TLS handshake complete");

        let mut request = self
            .endpoint
            .url()
            .into_client_request()
            .map_err(|e| SessionError::InvalidRequest(e.to_string()))?;
        let agent = HeaderValue::from_str(&self.endpoint.user_agent)
            .map_err(|e| SessionError::InvalidRequest(e.to_string()))?;
        request.headers_mut().insert(USER_AGENT, agent);

        let (stream, response) = tokio_tungstenite::client_async(request, tls)
            .await
            .map_err(SessionError::Upgrade)?;
        info!(url = %self.endpoint.url(), status = %response.status(), "Connected");

        Ok(stream)
    }
}

/// Try each resolved address in order and keep the first that accepts.
async fn connect_any(host: &str, addrs: &[SocketAddr]) -> Result<TcpStream, SessionError> {
    let mut last_error = None;
    for addr in addrs {
        match TcpStream::connect(addr).await {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                debug!(%addr, error = %e, "Connect attempt failed");
                last_error = Some(e);
            }
        }
    }

    match last_error {
        Some(e) => Err(SessionError::Connect(e)),
        None => Err(SessionError::NoAddress(host.to_string())),
    }
}

/// Build the rustls client configuration: system roots, checked against
/// the configured CRLs unless revocation checking was turned off.
fn client_config(tls: &TlsConfig) -> Result<ClientConfig, TlsSetupError> {
    let roots = native_roots()?;
    if !tls.check_revocation {
        warn!("Certificate revocation checking is disabled");
        return Ok(ClientConfig::builder()
            .with_root_certificates(roots)
            .with_no_client_auth());
    }

    let crls = load_crls(&tls.crl_paths)?;
    if crls.is_empty() {
        return Err(TlsSetupError::NoCrls);
    }
    info!(
        count = crls.len(),
        allow_unknown = tls.allow_unknown_revocation,
        "Certificate revocation checking enabled"
    );
    let mut builder = WebPkiServerVerifier::builder(Arc::new(roots)).with_crls(crls);
    if tls.allow_unknown_revocation {
        builder = builder.allow_unknown_revocation_status();
    }
    let verifier = builder.build()?;

    Ok(ClientConfig::builder()
        .with_webpki_verifier(verifier)
        .with_no_client_auth())
}

fn native_roots() -> Result<RootCertStore, TlsSetupError> {
    let mut roots = RootCertStore::empty();
    let native = rustls_native_certs::load_native_certs();
    for cert in native.certs {
        if let Err(e) = roots.add(cert) {
            warn!("Failed to add root cert: {}", e);
        }
    }
    for e in &native.errors {
        warn!("Error loading native certs: {}", e);
    }
    if roots.is_empty() {
        return Err(TlsSetupError::NoRootCertificates);
    }
    Ok(roots)
}

/// Read every CRL from the given PEM files.
pub(crate) fn load_crls<P: AsRef<Path>>(
    paths: &[P],
) -> Result<Vec<CertificateRevocationListDer<'static>>, TlsSetupError> {
    let mut crls = Vec::new();
    for path in paths {
        let path = path.as_ref();
        let display = path.display().to_string();
        let read_error = |source| TlsSetupError::CrlRead {
            path: display.clone(),
            source,
        };

        let file = File::open(path).map_err(read_error)?;
        let before = crls.len();
        for crl in rustls_pemfile::crls(&mut BufReader::new(file)) {
            crls.push(crl.map_err(read_error)?);
        }
        if crls.len() == before {
            return Err(TlsSetupError::EmptyCrl(display));
        }
    }
    Ok(crls)
}
