//! TLS configuration
//!
//! Builders for the client and server TLS contexts. A built `TlsConfig` is
//! immutable and can bind any number of transports into sessions.

use super::engine::OpenSslEngine;
use super::selfsigned::{SelfSigned, DEFAULT_COMMON_NAME};
use super::session::TlsSession;
use crate::error::{Error, Result};
use crate::scheduler::{PollScheduler, Scheduler};
use crate::transport::Transport;
use openssl::pkey::PKey;
use openssl::ssl::{
    AlpnError, SslContext, SslContextBuilder, SslMethod, SslVerifyMode, SslVersion,
};
use openssl::x509::X509;
use std::path::Path;
use std::str::FromStr;

/// TLS version
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TlsVersion {
    /// TLS 1.2
    Tls12,
    /// TLS 1.3
    Tls13,
}

impl TlsVersion {
    /// Get OpenSSL protocol version constant
    pub fn to_openssl_version(self) -> SslVersion {
        match self {
            TlsVersion::Tls12 => SslVersion::TLS1_2,
            TlsVersion::Tls13 => SslVersion::TLS1_3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TlsVersion::Tls12 => "TLSv1.2",
            TlsVersion::Tls13 => "TLSv1.3",
        }
    }
}

impl FromStr for TlsVersion {
    type Err = Error;

    /// Parse "TLSv1.2"-style names (case-insensitive)
    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "TLSV1.2" | "TLS1.2" => Ok(TlsVersion::Tls12),
            "TLSV1.3" | "TLS1.3" => Ok(TlsVersion::Tls13),
            _ => Err(Error::InvalidVersion(s.to_string())),
        }
    }
}

/// Client certificate verification mode (server-side)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientVerify {
    /// Don't request client certificates
    None,
    /// Request client certificate but don't require it
    Optional,
    /// Require client certificate
    Required,
}

/// TLS configuration (immutable after building)
#[derive(Clone)]
pub struct TlsConfig {
    pub(crate) ctx: SslContext,
    pub(crate) is_server: bool,
    pub(crate) servername: Option<String>,
}

impl TlsConfig {
    /// Create a new client configuration builder
    pub fn client() -> Result<ClientConfigBuilder> {
        ClientConfigBuilder::new()
    }

    /// Create a new server configuration builder
    pub fn server() -> Result<ServerConfigBuilder> {
        ServerConfigBuilder::new()
    }

    pub fn is_server(&self) -> bool {
        self.is_server
    }

    /// Bind a transport to this context without handshaking
    pub fn session<S: Transport>(&self, transport: S) -> Result<TlsSession<OpenSslEngine<S>>> {
        self.session_with(transport, PollScheduler::new())
    }

    /// Bind a transport to this context, waiting through `scheduler`
    pub fn session_with<S: Transport, W: Scheduler>(
        &self,
        transport: S,
        scheduler: W,
    ) -> Result<TlsSession<OpenSslEngine<S>, W>> {
        let mut ssl = openssl::ssl::Ssl::new(&self.ctx)?;
        if let Some(ref servername) = self.servername {
            ssl.set_hostname(servername)?;
        }

        let engine = OpenSslEngine::new(ssl, transport)?;
        Ok(TlsSession::new(engine, scheduler))
    }

    /// Connect to a server with TLS (client-side)
    pub fn connect<S: Transport>(&self, transport: S) -> Result<TlsSession<OpenSslEngine<S>>> {
        if self.is_server {
            return Err(Error::InvalidConfig(
                "Cannot use server config for client connection".to_string(),
            ));
        }
        self.session(transport)?.connect()
    }

    /// Accept a client connection with TLS (server-side)
    pub fn accept<S: Transport>(&self, transport: S) -> Result<TlsSession<OpenSslEngine<S>>> {
        if !self.is_server {
            return Err(Error::InvalidConfig(
                "Cannot use client config for server accept".to_string(),
            ));
        }
        self.session(transport)?.accept()
    }
}

fn set_versions(ctx: &mut SslContextBuilder, min: TlsVersion, max: TlsVersion) -> Result<()> {
    if min > max {
        return Err(Error::InvalidConfig(format!(
            "minimum version {} above maximum {}",
            min.as_str(),
            max.as_str()
        )));
    }
    ctx.set_min_proto_version(Some(min.to_openssl_version()))?;
    ctx.set_max_proto_version(Some(max.to_openssl_version()))?;
    Ok(())
}

fn load_pem_identity(ctx: &mut SslContextBuilder, path: &Path) -> Result<()> {
    let pem = std::fs::read(path)?;

    let cert = X509::from_pem(&pem)
        .map_err(|e| Error::Certificate(format!("Failed to load certificate: {}", e)))?;
    ctx.set_certificate(&cert)?;

    let key = PKey::private_key_from_pem(&pem)
        .map_err(|e| Error::Certificate(format!("Failed to load private key: {}", e)))?;
    ctx.set_private_key(&key)?;
    ctx.check_private_key()
        .map_err(|e| Error::Certificate(format!("Key does not match certificate: {}", e)))?;

    Ok(())
}

/// Client configuration builder
pub struct ClientConfigBuilder {
    ctx_builder: SslContextBuilder,
    servername: Option<String>,
}

impl ClientConfigBuilder {
    fn new() -> Result<Self> {
        let mut ctx_builder = SslContextBuilder::new(SslMethod::tls_client())?;

        // Default: don't verify peer
        ctx_builder.set_verify(SslVerifyMode::NONE);

        Ok(ClientConfigBuilder {
            ctx_builder,
            servername: None,
        })
    }

    /// Set TLS version (both min and max)
    pub fn version(self, version: TlsVersion) -> Result<Self> {
        self.version_range(version, version)
    }

    /// Set TLS version range
    pub fn version_range(mut self, min: TlsVersion, max: TlsVersion) -> Result<Self> {
        set_versions(&mut self.ctx_builder, min, max)?;
        Ok(self)
    }

    /// Set cipher list (for TLS <= 1.2)
    pub fn cipher_list(mut self, ciphers: &str) -> Result<Self> {
        self.ctx_builder.set_cipher_list(ciphers)?;
        Ok(self)
    }

    /// Set cipher suites (for TLS 1.3)
    pub fn ciphersuites(mut self, ciphers: &str) -> Result<Self> {
        self.ctx_builder.set_ciphersuites(ciphers)?;
        Ok(self)
    }

    /// Set ALPN protocols, in preference order
    pub fn alpn(mut self, protocols: &[&str]) -> Result<Self> {
        let mut wire = Vec::new();
        for proto in protocols {
            let len = u8::try_from(proto.len())
                .map_err(|_| Error::InvalidConfig(format!("ALPN protocol too long: {}", proto)))?;
            wire.push(len);
            wire.extend_from_slice(proto.as_bytes());
        }
        self.ctx_builder.set_alpn_protos(&wire)?;
        Ok(self)
    }

    /// Set SNI servername
    pub fn servername(mut self, name: impl Into<String>) -> Self {
        self.servername = Some(name.into());
        self
    }

    /// Enable/disable peer certificate verification
    pub fn verify_peer(mut self, verify: bool) -> Self {
        let mode = if verify {
            SslVerifyMode::PEER
        } else {
            SslVerifyMode::NONE
        };
        self.ctx_builder.set_verify(mode);
        self
    }

    /// Trust the CA certificates in a PEM file
    pub fn ca_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        self.ctx_builder.set_ca_file(path.as_ref())?;
        Ok(self)
    }

    /// Load client certificate and key from one PEM file
    pub fn cert_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        load_pem_identity(&mut self.ctx_builder, path.as_ref())?;
        Ok(self)
    }

    /// Build the TLS configuration
    pub fn build(self) -> Result<TlsConfig> {
        Ok(TlsConfig {
            ctx: self.ctx_builder.build(),
            is_server: false,
            servername: self.servername,
        })
    }
}

/// Server configuration builder
pub struct ServerConfigBuilder {
    ctx_builder: SslContextBuilder,
    has_cert: bool,
}

impl ServerConfigBuilder {
    fn new() -> Result<Self> {
        let ctx_builder = SslContextBuilder::new(SslMethod::tls_server())?;

        Ok(ServerConfigBuilder {
            ctx_builder,
            has_cert: false,
        })
    }

    /// Set TLS version (both min and max)
    pub fn version(self, version: TlsVersion) -> Result<Self> {
        self.version_range(version, version)
    }

    /// Set TLS version range
    pub fn version_range(mut self, min: TlsVersion, max: TlsVersion) -> Result<Self> {
        set_versions(&mut self.ctx_builder, min, max)?;
        Ok(self)
    }

    /// Set cipher list (for TLS <= 1.2)
    pub fn cipher_list(mut self, ciphers: &str) -> Result<Self> {
        self.ctx_builder.set_cipher_list(ciphers)?;
        Ok(self)
    }

    /// Set cipher suites (for TLS 1.3)
    pub fn ciphersuites(mut self, ciphers: &str) -> Result<Self> {
        self.ctx_builder.set_ciphersuites(ciphers)?;
        Ok(self)
    }

    /// Accept the first client ALPN protocol that appears in `protocols`
    pub fn alpn(mut self, protocols: &[&str]) -> Self {
        let ours: Vec<Vec<u8>> = protocols.iter().map(|p| p.as_bytes().to_vec()).collect();

        self.ctx_builder
            .set_alpn_select_callback(move |_ssl, client_protos| {
                let mut rest = client_protos;
                while let Some((&len, tail)) = rest.split_first() {
                    let len = len as usize;
                    if len > tail.len() {
                        break;
                    }
                    let (proto, next) = tail.split_at(len);
                    if ours.iter().any(|p| p.as_slice() == proto) {
                        return Ok(proto);
                    }
                    rest = next;
                }
                Err(AlpnError::NOACK)
            });
        self
    }

    /// Load server certificate and key from one PEM file
    pub fn cert_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        load_pem_identity(&mut self.ctx_builder, path.as_ref())?;
        self.has_cert = true;
        Ok(self)
    }

    /// Set client certificate verification mode
    pub fn client_verify(mut self, mode: ClientVerify) -> Self {
        let verify_mode = match mode {
            ClientVerify::None => SslVerifyMode::NONE,
            ClientVerify::Optional => SslVerifyMode::PEER,
            ClientVerify::Required => SslVerifyMode::PEER | SslVerifyMode::FAIL_IF_NO_PEER_CERT,
        };

        self.ctx_builder.set_verify(verify_mode);
        self
    }

    /// Set CA file for client certificate verification
    pub fn client_verify_ca<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        self.ctx_builder.set_ca_file(path.as_ref())?;
        Ok(self)
    }

    /// Build the TLS configuration
    ///
    /// Without a loaded certificate an ephemeral self-signed one is used.
    pub fn build(mut self) -> Result<TlsConfig> {
        if !self.has_cert {
            let pair = SelfSigned::generate(DEFAULT_COMMON_NAME)?;
            self.ctx_builder.set_certificate(&pair.cert)?;
            self.ctx_builder.set_private_key(&pair.key)?;
            log::debug!("[tls] server using ephemeral certificate for {}", DEFAULT_COMMON_NAME);
        }

        Ok(TlsConfig {
            ctx: self.ctx_builder.build(),
            is_server: true,
            servername: None,
        })
    }
}
