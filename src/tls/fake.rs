//! Scripted engine and scheduler for unit tests

use super::classify::Classification;
use super::engine::TlsEngine;
use crate::scheduler::Scheduler;
use std::cell::Cell;
use std::collections::VecDeque;
use std::io;
use std::os::fd::RawFd;
use std::os::unix::net::UnixStream;

/// Number of calls made into the engine, per operation
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Calls {
    pub accept: usize,
    pub connect: usize,
    pub read: usize,
    pub write: usize,
    pub shutdown: usize,
}

impl Calls {
    pub fn total(&self) -> usize {
        self.accept + self.connect + self.read + self.write + self.shutdown
    }
}

/// Engine that replays queued outcomes
///
/// Empty queues fall back to: handshake and shutdown succeed, reads report
/// close-notify, writes accept everything.
pub(crate) struct FakeEngine {
    transport: UnixStream,
    handshakes: VecDeque<Result<(), Classification>>,
    reads: VecDeque<Result<Vec<u8>, Classification>>,
    writes: VecDeque<Result<usize, Classification>>,
    shutdowns: VecDeque<Result<(), Classification>>,
    pub calls: Calls,
    /// Application bytes accepted by `write`, in order
    pub written: Vec<u8>,
}

impl FakeEngine {
    pub fn new(transport: UnixStream) -> Self {
        FakeEngine {
            transport,
            handshakes: VecDeque::new(),
            reads: VecDeque::new(),
            writes: VecDeque::new(),
            shutdowns: VecDeque::new(),
            calls: Calls::default(),
            written: Vec::new(),
        }
    }

    /// Engine over one end of a fresh socket pair; the peer end is returned
    pub fn pair() -> (Self, UnixStream) {
        let (ours, theirs) = UnixStream::pair().expect("socketpair");
        (FakeEngine::new(ours), theirs)
    }

    pub fn with_handshake(mut self, step: Result<(), Classification>) -> Self {
        self.handshakes.push_back(step);
        self
    }

    pub fn with_read(mut self, step: Result<&[u8], Classification>) -> Self {
        self.reads.push_back(step.map(|data| data.to_vec()));
        self
    }

    /// `Ok(n)` accepts at most `n` bytes of the offered buffer
    pub fn with_write(mut self, step: Result<usize, Classification>) -> Self {
        self.writes.push_back(step);
        self
    }

    pub fn with_shutdown(mut self, step: Result<(), Classification>) -> Self {
        self.shutdowns.push_back(step);
        self
    }

    fn handshake_step(&mut self) -> Result<(), Classification> {
        self.handshakes.pop_front().unwrap_or(Ok(()))
    }
}

impl TlsEngine for FakeEngine {
    type Transport = UnixStream;

    fn accept(&mut self) -> Result<(), Classification> {
        self.calls.accept += 1;
        self.handshake_step()
    }

    fn connect(&mut self) -> Result<(), Classification> {
        self.calls.connect += 1;
        self.handshake_step()
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Classification> {
        self.calls.read += 1;
        let data = match self.reads.pop_front() {
            Some(step) => step?,
            None => return Err(Classification::ZeroReturn),
        };

        let n = data.len().min(buf.len());
        buf[..n].copy_from_slice(&data[..n]);
        if n < data.len() {
            self.reads.push_front(Ok(data[n..].to_vec()));
        }
        Ok(n)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize, Classification> {
        self.calls.write += 1;
        let limit = match self.writes.pop_front() {
            Some(step) => step?,
            None => buf.len(),
        };

        let n = limit.min(buf.len());
        self.written.extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn shutdown(&mut self) -> Result<(), Classification> {
        self.calls.shutdown += 1;
        self.shutdowns.pop_front().unwrap_or(Ok(()))
    }

    fn transport(&self) -> &UnixStream {
        &self.transport
    }

    fn transport_mut(&mut self) -> &mut UnixStream {
        &mut self.transport
    }

    fn into_transport(self) -> io::Result<UnixStream> {
        Ok(self.transport)
    }
}

/// Scheduler that returns immediately and counts waits
#[derive(Debug, Default)]
pub(crate) struct CountingScheduler {
    readable: Cell<usize>,
    writable: Cell<usize>,
    fail: Option<io::ErrorKind>,
}

impl CountingScheduler {
    /// Scheduler whose every wait fails with `kind`
    pub fn failing(kind: io::ErrorKind) -> Self {
        CountingScheduler {
            fail: Some(kind),
            ..Default::default()
        }
    }

    pub fn readable(&self) -> usize {
        self.readable.get()
    }

    pub fn writable(&self) -> usize {
        self.writable.get()
    }

    fn finish(&self) -> io::Result<()> {
        match self.fail {
            Some(kind) => Err(io::Error::new(kind, "scripted wait failure")),
            None => Ok(()),
        }
    }
}

impl Scheduler for CountingScheduler {
    fn wait_readable(&self, _fd: RawFd) -> io::Result<()> {
        self.readable.set(self.readable.get() + 1);
        self.finish()
    }

    fn wait_writable(&self, _fd: RawFd) -> io::Result<()> {
        self.writable.set(self.writable.get() + 1);
        self.finish()
    }
}
