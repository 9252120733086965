//! TLS sessions over non-blocking transports
//!
//! # Architecture
//!
//! 1. `classify` maps every failed engine call to a `Classification`
//! 2. `RetryDriver` waits on the descriptor for retryable outcomes and
//!    calls again, up to `MAX_RETRIES` times
//! 3. `SessionState` decides whether an operation goes to the raw
//!    transport, to the engine, or fails with the captured fault
//! 4. `TlsSession` is the stream adapter built from the three above
//!
//! # Examples
//!
//! ```no_run
//! use nbtls::tls::{TlsConfig, TlsVersion};
//! use std::io::{Read, Write};
//! use std::net::TcpListener;
//!
//! let config = TlsConfig::server()
//!     .unwrap()
//!     .version(TlsVersion::Tls13)
//!     .unwrap()
//!     .build()
//!     .unwrap();
//!
//! let listener = TcpListener::bind("127.0.0.1:4433").unwrap();
//! let (tcp, _) = listener.accept().unwrap();
//! let mut session = config.accept(tcp).unwrap();
//!
//! let mut buf = [0u8; 4];
//! session.read_exact(&mut buf).unwrap();
//! session.write_all(&buf).unwrap();
//! session.close().unwrap();
//! ```

pub mod cert;
pub mod classify;
pub mod config;
pub mod engine;
pub mod handshake;
pub mod info;
pub mod retry;
pub mod selfsigned;
pub mod session;
pub mod state;

#[cfg(test)]
pub(crate) mod fake;

pub use cert::CertInfo;
pub use classify::{classify, Classification};
pub use config::{ClientConfigBuilder, ClientVerify, ServerConfigBuilder, TlsConfig, TlsVersion};
pub use engine::{OpenSslEngine, TlsEngine};
pub use handshake::Role;
pub use info::SessionInfo;
pub use retry::{EofKind, Progress, RetryDriver, MAX_RETRIES};
pub use selfsigned::SelfSigned;
pub use session::TlsSession;
pub use state::SessionState;
