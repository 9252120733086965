//! TLS engine seam
//!
//! `TlsEngine` is everything the session needs from the TLS library: one
//! call per operation, each either completing or returning a
//! `Classification`. `OpenSslEngine` is the production implementation.

use super::classify::{classify, Classification};
use crate::transport::Transport;
use openssl::ssl::{Ssl, SslRef, SslStream};
use std::io;

/// One-shot TLS operations bound to a raw transport
pub trait TlsEngine {
    type Transport: Transport;

    /// Run one step of the server-side handshake
    fn accept(&mut self) -> Result<(), Classification>;

    /// Run one step of the client-side handshake
    fn connect(&mut self) -> Result<(), Classification>;

    /// Decrypt into `buf`
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Classification>;

    /// Encrypt and send a prefix of `buf`
    fn write(&mut self, buf: &[u8]) -> Result<usize, Classification>;

    /// Send close-notify
    fn shutdown(&mut self) -> Result<(), Classification>;

    fn transport(&self) -> &Self::Transport;

    fn transport_mut(&mut self) -> &mut Self::Transport;

    /// Release the engine, keeping the transport open
    fn into_transport(self) -> io::Result<Self::Transport>
    where
        Self: Sized;
}

/// OpenSSL session bound to a transport
pub struct OpenSslEngine<S> {
    stream: SslStream<S>,
}

impl<S: Transport> OpenSslEngine<S> {
    /// Bind a configured `Ssl` to a transport
    pub fn new(ssl: Ssl, transport: S) -> crate::Result<Self> {
        let stream = SslStream::new(ssl, transport)?;
        Ok(OpenSslEngine { stream })
    }

    /// The OpenSSL session, for peer inspection
    pub fn ssl(&self) -> &SslRef {
        self.stream.ssl()
    }
}

impl<S: Transport> TlsEngine for OpenSslEngine<S> {
    type Transport = S;

    fn accept(&mut self) -> Result<(), Classification> {
        self.stream.accept().map_err(classify)
    }

    fn connect(&mut self) -> Result<(), Classification> {
        self.stream.connect().map_err(classify)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Classification> {
        self.stream.ssl_read(buf).map_err(classify)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize, Classification> {
        self.stream.ssl_write(buf).map_err(classify)
    }

    fn shutdown(&mut self) -> Result<(), Classification> {
        // Sent or Received both mean our close-notify is out
        self.stream.shutdown().map(|_| ()).map_err(classify)
    }

    fn transport(&self) -> &S {
        self.stream.get_ref()
    }

    fn transport_mut(&mut self) -> &mut S {
        self.stream.get_mut()
    }

    fn into_transport(self) -> io::Result<S> {
        // SslStream owns its transport; freeing it closes only the original
        // descriptor and sends nothing on the wire
        self.stream.get_ref().duplicate()
    }
}
