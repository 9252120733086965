//! Negotiated session parameters
//!
//! A `SessionInfo` is a snapshot of what the handshake settled on, taken
//! from the engine's session handle.

use super::cert::{peer_chain, CertInfo};
use super::engine::OpenSslEngine;
use super::session::TlsSession;
use crate::scheduler::Scheduler;
use crate::transport::Transport;
use openssl::ssl::{NameType, SslRef};

/// Parameters negotiated by the handshake
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    /// Negotiated protocol version (e.g., "TLSv1.3")
    pub version: String,
    /// Negotiated cipher suite
    pub cipher: Option<String>,
    /// SNI servername
    pub servername: Option<String>,
    /// Negotiated ALPN protocol
    pub alpn: Option<String>,
    /// Whether the session was resumed
    pub reused: bool,
    /// Peer certificate first, then the rest of its chain
    pub peer_chain: Vec<CertInfo>,
}

impl SessionInfo {
    pub fn from_ssl(ssl: &SslRef) -> Self {
        SessionInfo {
            version: ssl.version_str().to_string(),
            cipher: ssl.current_cipher().map(|c| c.name().to_string()),
            servername: ssl.servername(NameType::HOST_NAME).map(|s| s.to_string()),
            alpn: ssl
                .selected_alpn_protocol()
                .map(|p| String::from_utf8_lossy(p).into_owned()),
            reused: ssl.session_reused(),
            peer_chain: peer_chain(ssl),
        }
    }

    /// The peer's own certificate, if it presented one
    pub fn peer(&self) -> Option<&CertInfo> {
        self.peer_chain.first()
    }
}

impl<S: Transport, W: Scheduler> TlsSession<OpenSslEngine<S>, W> {
    /// The OpenSSL session handle
    pub fn ssl(&self) -> &SslRef {
        self.engine().ssl()
    }

    /// Snapshot of the negotiated parameters
    pub fn info(&self) -> SessionInfo {
        SessionInfo::from_ssl(self.ssl())
    }

    /// The peer's certificate, if it presented one
    pub fn peer_certificate(&self) -> Option<CertInfo> {
        self.ssl()
            .peer_certificate()
            .map(|cert| CertInfo::from_x509_ref(&cert))
    }
}
