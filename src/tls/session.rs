//! TLS session stream adapter
//!
//! `TlsSession` routes every operation by session state: raw transport I/O
//! before the handshake and after a clean shutdown, engine I/O through the
//! retry driver while connected, and the captured fault once poisoned.

use super::classify::{classify_io, classify_io_write, Classification};
use super::engine::TlsEngine;
use super::retry::{EofKind, Progress, RetryDriver, MAX_RETRIES};
use super::state::SessionState;
use crate::error::{Error, Result};
use crate::scheduler::{PollScheduler, Scheduler};
use crate::session::SessionOps;
use crate::transport::Transport;
use std::io::{self, IoSlice, Read, Write};
use std::net::Shutdown;
use std::os::fd::{AsRawFd, RawFd};

/// TLS session over a non-blocking transport
///
/// A session starts `Uninitialized`; [`accept`](TlsSession::accept) or
/// [`connect`](TlsSession::connect) consume it and return it `Connected`.
/// Callers must not drive one session from two tasks at once.
pub struct TlsSession<E, W = PollScheduler> {
    pub(super) engine: E,
    pub(super) scheduler: W,
    pub(super) state: SessionState,
    retry_limit: usize,
    nonblocking: bool,
}

impl<E: TlsEngine, W: Scheduler> TlsSession<E, W> {
    /// Wrap an engine that has not handshaken yet
    pub fn new(engine: E, scheduler: W) -> Self {
        TlsSession {
            engine,
            scheduler,
            state: SessionState::Uninitialized,
            retry_limit: MAX_RETRIES,
            nonblocking: false,
        }
    }

    /// Override the per-operation retry ceiling
    ///
    /// Every driven operation makes at least one attempt; a limit of zero
    /// is raised to one.
    pub fn with_retry_limit(mut self, limit: usize) -> Self {
        self.retry_limit = limit.max(1);
        self
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn scheduler(&self) -> &W {
        &self.scheduler
    }

    /// Get reference to the underlying transport
    pub fn get_ref(&self) -> &E::Transport {
        self.engine.transport()
    }

    /// Get mutable reference to the underlying transport
    ///
    /// Reading or writing it directly while connected corrupts the TLS
    /// stream.
    pub fn get_mut(&mut self) -> &mut E::Transport {
        self.engine.transport_mut()
    }

    /// Take the transport back, dropping the TLS engine
    ///
    /// Only a session that never handshook or that finished a clean
    /// shutdown gives up its transport. The transport stays non-blocking
    /// if the session switched it.
    pub fn into_inner(self) -> Result<E::Transport> {
        self.state.check()?;
        if self.state.is_connected() {
            return Err(Error::InvalidState(
                "transport is still carrying a TLS session".to_string(),
            ));
        }
        Ok(self.engine.into_transport()?)
    }

    /// Put the descriptor in non-blocking mode, once
    pub(super) fn ensure_nonblocking(&mut self) -> Result<()> {
        if !self.nonblocking {
            self.engine.transport().set_nonblocking(true)?;
            self.nonblocking = true;
        }
        Ok(())
    }

    /// Descriptor the session waits on
    pub fn raw_fd(&self) -> RawFd {
        self.engine.transport().as_raw_fd()
    }

    /// Run one engine operation under the retry driver
    pub(super) fn drive<T, F>(&mut self, mut op: F) -> Result<Progress<T>>
    where
        F: FnMut(&mut E) -> std::result::Result<T, Classification>,
    {
        let fd = self.engine.transport().as_raw_fd();
        let engine = &mut self.engine;
        RetryDriver::new(&self.scheduler, fd)
            .limit(self.retry_limit)
            .run(&mut self.state, || op(engine))
    }

    fn end_of_stream(&mut self, kind: EofKind) {
        match kind {
            EofKind::CloseNotify => log::debug!("[tls] close-notify received"),
            EofKind::Unexpected => {
                log::debug!("[tls] transport closed without close-notify");
                // the engine must not be asked for close-notify after this
                self.state.close_clean();
            }
        }
    }

    /// Read into `buf`; `Ok(0)` means end of stream
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        self.state.check()?;

        let raw = !self.state.is_connected();
        let progress = if raw {
            self.ensure_nonblocking()?;
            self.drive(|engine| {
                engine
                    .transport_mut()
                    .read(&mut buf[..])
                    .map_err(classify_io)
            })?
        } else {
            self.drive(|engine| engine.read(&mut buf[..]))?
        };

        match progress {
            Progress::Done(n) => Ok(n),
            Progress::Eof(kind) => {
                self.end_of_stream(kind);
                Ok(0)
            }
        }
    }

    /// Write every buffer in order
    ///
    /// Each buffer is fully accepted before the next one starts. If the peer
    /// ends the stream part way, the bytes accepted so far are returned and
    /// the rest are dropped. After a clean shutdown nothing is sent and
    /// `Ok(0)` is returned.
    pub fn write_vectored(&mut self, bufs: &[IoSlice<'_>]) -> Result<usize> {
        let total: usize = bufs.iter().map(|b| b.len()).sum();
        if total == 0 {
            return Ok(0);
        }
        self.state.check()?;

        let raw = match self.state {
            SessionState::Uninitialized => true,
            SessionState::Connected => false,
            _ => return Ok(0),
        };
        if raw {
            self.ensure_nonblocking()?;
        }

        let mut written = 0;
        for buf in bufs {
            let mut offset = 0;
            while offset < buf.len() {
                let chunk = &buf[offset..];
                let progress = if raw {
                    self.drive(|engine| {
                        engine
                            .transport_mut()
                            .write(chunk)
                            .map_err(classify_io_write)
                    })?
                } else {
                    self.drive(|engine| engine.write(chunk))?
                };

                match progress {
                    Progress::Done(0) => {
                        log::debug!("[tls] write accepted nothing after {} bytes", written);
                        return Ok(written);
                    }
                    Progress::Done(n) => {
                        offset += n;
                        written += n;
                    }
                    Progress::Eof(kind) => {
                        self.end_of_stream(kind);
                        log::debug!(
                            "[tls] stream ended after {} of {} bytes written",
                            written,
                            total
                        );
                        return Ok(written);
                    }
                }
            }
        }

        Ok(written)
    }

    /// Shut down one direction
    ///
    /// `Shutdown::Read` never touches the engine. `Write` and `Both` send
    /// close-notify on a connected session and are no-ops otherwise.
    pub fn shutdown(&mut self, how: Shutdown) -> Result<()> {
        self.state.check()?;
        if how == Shutdown::Read || !self.state.is_connected() {
            return Ok(());
        }

        match self.drive(|engine| engine.shutdown())? {
            Progress::Done(()) => {}
            Progress::Eof(kind) => log::debug!("[tls] close-notify met end of stream: {:?}", kind),
        }
        self.state.close_clean();
        Ok(())
    }

    /// Shut down both directions, then the transport itself
    ///
    /// The transport is shut down even when the TLS shutdown fails; the
    /// first error is returned.
    pub fn close(&mut self) -> Result<()> {
        let tls = self.shutdown(Shutdown::Both);

        let raw = match self.engine.transport().shutdown(Shutdown::Both) {
            Err(e) if e.kind() == io::ErrorKind::NotConnected => Ok(()),
            other => other,
        };

        tls?;
        raw?;
        Ok(())
    }
}

impl<E: TlsEngine, W: Scheduler> SessionOps for TlsSession<E, W> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        TlsSession::read(self, buf)
    }

    fn write_vectored(&mut self, bufs: &[IoSlice<'_>]) -> Result<usize> {
        TlsSession::write_vectored(self, bufs)
    }

    fn shutdown(&mut self, how: Shutdown) -> Result<()> {
        TlsSession::shutdown(self, how)
    }

    fn close(&mut self) -> Result<()> {
        TlsSession::close(self)
    }
}

impl<E: TlsEngine, W: Scheduler> Read for TlsSession<E, W> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        TlsSession::read(self, buf).map_err(io::Error::from)
    }
}

impl<E: TlsEngine, W: Scheduler> Write for TlsSession<E, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        TlsSession::write_vectored(self, &[IoSlice::new(buf)]).map_err(io::Error::from)
    }

    fn write_vectored(&mut self, bufs: &[IoSlice<'_>]) -> io::Result<usize> {
        TlsSession::write_vectored(self, bufs).map_err(io::Error::from)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.engine.transport_mut().flush()
    }
}
