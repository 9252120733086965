//! Error types
//!
//! `Error` is what every public operation returns. `Fault` is the captured
//! cause of a session that the TLS engine declared broken; it is cloned into
//! every later error so callers see the same cause each time.

use std::fmt;
use std::io;

/// Result type for session operations
pub type Result<T> = std::result::Result<T, Error>;

/// Session and configuration errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("OpenSSL error: {0}")]
    OpenSsl(#[from] openssl::error::ErrorStack),

    #[error("TLS fault: {0}")]
    Tls(Fault),

    #[error("no progress after {0} retries")]
    TooManyRetries(usize),

    #[error("Invalid TLS version: {0}")]
    InvalidVersion(String),

    #[error("Invalid session state: {0}")]
    InvalidState(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Certificate error: {0}")]
    Certificate(String),
}

impl Error {
    /// The captured fault, if this error poisoned a session
    pub fn fault(&self) -> Option<&Fault> {
        match self {
            Error::Tls(fault) => Some(fault),
            _ => None,
        }
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> io::Error {
        match err {
            Error::Io(e) => e,
            Error::TooManyRetries(_) => io::Error::new(io::ErrorKind::TimedOut, err.to_string()),
            Error::Tls(ref fault) if fault.kind == FaultKind::Syscall => {
                io::Error::new(fault.io_kind.unwrap_or(io::ErrorKind::Other), err.to_string())
            }
            other => io::Error::new(io::ErrorKind::Other, other.to_string()),
        }
    }
}

/// Where an unrecoverable TLS fault originated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// The transport failed underneath the engine
    Syscall,
    /// The engine detected a protocol violation
    Protocol,
}

/// Captured description of a fatal TLS fault
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    pub kind: FaultKind,
    /// OpenSSL library code of the first queued error
    pub library: Option<i32>,
    /// OpenSSL reason code of the first queued error
    pub reason: Option<i32>,
    /// Kind of the transport error, for syscall faults
    pub io_kind: Option<io::ErrorKind>,
    pub message: String,
}

impl Fault {
    /// A protocol fault with an explicit reason code
    pub fn protocol(library: i32, reason: i32, message: impl Into<String>) -> Self {
        Fault {
            kind: FaultKind::Protocol,
            library: Some(library),
            reason: Some(reason),
            io_kind: None,
            message: message.into(),
        }
    }

    /// A transport failure reported through the engine
    pub fn syscall(err: &io::Error) -> Self {
        Fault {
            kind: FaultKind::Syscall,
            library: None,
            reason: None,
            io_kind: Some(err.kind()),
            message: err.to_string(),
        }
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.kind, self.library, self.reason) {
            (FaultKind::Protocol, Some(lib), Some(reason)) => {
                write!(f, "{} (lib {}, reason {})", self.message, lib, reason)
            }
            (FaultKind::Syscall, _, _) => write!(f, "transport: {}", self.message),
            _ => f.write_str(&self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_display() {
        let fault = Fault::protocol(20, 1040, "sslv3 alert handshake failure");
        assert_eq!(
            fault.to_string(),
            "sslv3 alert handshake failure (lib 20, reason 1040)"
        );

        let io = io::Error::new(io::ErrorKind::ConnectionReset, "reset by peer");
        let fault = Fault::syscall(&io);
        assert_eq!(fault.to_string(), "transport: reset by peer");
    }

    #[test]
    fn test_into_io_error_keeps_transport_kind() {
        let io = io::Error::new(io::ErrorKind::BrokenPipe, "broken pipe");
        let err: io::Error = Error::Tls(Fault::syscall(&io)).into();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);

        let err: io::Error = Error::TooManyRetries(64).into();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
    }
}
