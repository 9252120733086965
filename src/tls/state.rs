//! Session state machine
//!
//! ```text
//! Uninitialized --handshake--> Connected --close-notify--> ShutdownClean
//!       |                          |
//!       +-------- fault -----------+------------------> ShutdownError
//! ```
//!
//! There is no way back to `Uninitialized` or `Connected`. Once
//! `ShutdownError` is entered the engine must not be called again.

use crate::error::{Error, Fault, Result};

/// Lifecycle of a TLS session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// No handshake yet; I/O bypasses TLS
    Uninitialized,
    /// Handshake complete; all I/O goes through the engine
    Connected,
    /// Close-notify exchanged; reads drain the raw transport
    ShutdownClean,
    /// The engine reported an unrecoverable fault
    ShutdownError(Fault),
}

impl SessionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, SessionState::Connected)
    }

    pub fn is_shutdown(&self) -> bool {
        matches!(
            self,
            SessionState::ShutdownClean | SessionState::ShutdownError(_)
        )
    }

    /// Fail with the captured cause if the session is poisoned
    pub fn check(&self) -> Result<()> {
        match self {
            SessionState::ShutdownError(fault) => Err(Error::Tls(fault.clone())),
            _ => Ok(()),
        }
    }

    /// `Uninitialized -> Connected`, exactly once
    pub(crate) fn establish(&mut self) {
        assert!(
            matches!(self, SessionState::Uninitialized),
            "handshake completed on a session in state {:?}",
            self
        );
        log::debug!("[tls] session established");
        *self = SessionState::Connected;
    }

    /// `Connected -> ShutdownClean`; no-op from any other state
    pub(crate) fn close_clean(&mut self) {
        if self.is_connected() {
            log::debug!("[tls] session shut down cleanly");
            *self = SessionState::ShutdownClean;
        }
    }

    /// Enter `ShutdownError`, keeping the first captured cause
    pub(crate) fn fail(&mut self, fault: Fault) -> Error {
        if let SessionState::ShutdownError(existing) = self {
            return Error::Tls(existing.clone());
        }
        log::warn!("[tls] session poisoned: {}", fault);
        *self = SessionState::ShutdownError(fault.clone());
        Error::Tls(fault)
    }
}

impl Default for SessionState {
    fn default() -> Self {
        SessionState::Uninitialized
    }
}
