//! nbtls - TLS sessions for cooperative, readiness-driven I/O
//!
//! This crate lets an OpenSSL session run over a non-blocking transport.
//! The TLS engine keeps its classic call interface (handshake, read, write,
//! shutdown that either complete or report "want read"/"want write"); every
//! such report is turned into a wait on the raw descriptor through a
//! [`Scheduler`], after which the call is retried.
//!
//! # Architecture
//!
//! - [`transport`] - the raw byte stream beneath TLS
//! - [`scheduler`] - the suspension primitive (wait until readable/writable)
//! - [`tls`] - error classification, retry driver, session state machine
//!   and the stream adapter itself
//! - [`copy`] - forwarding an arbitrary source into a session
//!
//! # Examples
//!
//! ```no_run
//! use nbtls::tls::TlsConfig;
//! use std::io::{Read, Write};
//! use std::net::TcpStream;
//!
//! let config = TlsConfig::client().unwrap().servername("localhost").build().unwrap();
//! let tcp = TcpStream::connect("127.0.0.1:4433").unwrap();
//! let mut session = config.connect(tcp).unwrap();
//!
//! session.write_all(b"ping").unwrap();
//! let mut buf = [0u8; 4];
//! session.read_exact(&mut buf).unwrap();
//! ```

pub mod copy;
pub mod error;
pub mod scheduler;
pub mod session;
pub mod tls;
pub mod transport;

pub use copy::{copy, Chunk, DirectSource, Source};
pub use error::{Error, Fault, FaultKind, Result};
pub use scheduler::{Interest, PollScheduler, Scheduler};
pub use session::SessionOps;
pub use transport::Transport;
