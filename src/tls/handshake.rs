//! TLS handshake
//!
//! A handshake consumes an `Uninitialized` session, switches its transport
//! to non-blocking mode and runs the engine's handshake under the retry
//! driver. Handshaking a session twice is a programming error and panics.

use super::engine::TlsEngine;
use super::retry::Progress;
use super::session::TlsSession;
use super::state::SessionState;
use crate::error::{Error, Result};
use crate::scheduler::Scheduler;
use crate::transport::Transport;
use std::io;

/// Side of the handshake this session plays
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Server,
    Client,
}

impl<E: TlsEngine, W: Scheduler> TlsSession<E, W> {
    /// Run the server-side handshake
    pub fn accept(self) -> Result<Self> {
        self.handshake(Role::Server)
    }

    /// Run the client-side handshake
    pub fn connect(self) -> Result<Self> {
        self.handshake(Role::Client)
    }

    /// Run the handshake for `role`
    pub fn handshake(mut self, role: Role) -> Result<Self> {
        assert!(
            matches!(self.state, SessionState::Uninitialized),
            "{:?} handshake on a session in state {:?}",
            role,
            self.state
        );

        self.ensure_nonblocking()?;
        log::debug!("[tls] {:?} handshake on fd {}", role, self.raw_fd());

        let progress = self.drive(|engine| match role {
            Role::Server => engine.accept(),
            Role::Client => engine.connect(),
        })?;

        match progress {
            Progress::Done(()) => {
                self.state.establish();
                Ok(self)
            }
            Progress::Eof(kind) => Err(Error::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("peer closed the stream during handshake ({:?})", kind),
            ))),
        }
    }
}
