//! Readiness scheduling
//!
//! The scheduler is the only place a session suspends. The retry driver asks
//! it to wait until the raw descriptor is readable or writable and then
//! retries the TLS call that reported "want read"/"want write".

use std::io;
use std::os::fd::RawFd;
use std::time::Duration;

/// Readiness a suspended session is waiting for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interest {
    Readable,
    Writable,
}

/// Suspension primitive keyed by a raw descriptor
pub trait Scheduler {
    /// Suspend the calling task until `fd` is readable
    fn wait_readable(&self, fd: RawFd) -> io::Result<()>;

    /// Suspend the calling task until `fd` is writable
    fn wait_writable(&self, fd: RawFd) -> io::Result<()>;

    /// Suspend until `fd` has the given readiness
    fn wait(&self, fd: RawFd, interest: Interest) -> io::Result<()> {
        match interest {
            Interest::Readable => self.wait_readable(fd),
            Interest::Writable => self.wait_writable(fd),
        }
    }
}

impl<S: Scheduler + ?Sized> Scheduler for &S {
    fn wait_readable(&self, fd: RawFd) -> io::Result<()> {
        (**self).wait_readable(fd)
    }

    fn wait_writable(&self, fd: RawFd) -> io::Result<()> {
        (**self).wait_writable(fd)
    }
}

impl<S: Scheduler + ?Sized> Scheduler for Box<S> {
    fn wait_readable(&self, fd: RawFd) -> io::Result<()> {
        (**self).wait_readable(fd)
    }

    fn wait_writable(&self, fd: RawFd) -> io::Result<()> {
        (**self).wait_writable(fd)
    }
}

/// Scheduler that parks the calling thread in `poll(2)`
///
/// Each session gets its own thread, so parking the thread is the
/// suspension. An optional timeout bounds every single wait; when it
/// expires the wait fails with `TimedOut` and the in-flight operation is
/// abandoned between retries.
#[derive(Debug, Clone, Copy, Default)]
pub struct PollScheduler {
    timeout: Option<Duration>,
}

impl PollScheduler {
    /// Scheduler that waits without a deadline
    pub fn new() -> Self {
        PollScheduler { timeout: None }
    }

    /// Scheduler whose waits give up after `timeout`
    pub fn with_timeout(timeout: Duration) -> Self {
        PollScheduler {
            timeout: Some(timeout),
        }
    }

    /// Get the per-wait timeout
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn poll(&self, fd: RawFd, interest: Interest) -> io::Result<()> {
        use libc::{poll, pollfd, POLLIN, POLLOUT};

        let mut pfd = pollfd {
            fd,
            events: match interest {
                Interest::Readable => POLLIN,
                Interest::Writable => POLLOUT,
            },
            revents: 0,
        };

        let timeout_ms = self
            .timeout
            .map(|d| d.as_millis().min(i32::MAX as u128) as i32)
            .unwrap_or(-1); // -1 = infinite

        loop {
            let result = unsafe { poll(&mut pfd as *mut pollfd, 1, timeout_ms) };

            if result < 0 {
                let err = io::Error::last_os_error();
                if err.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(err);
            }

            if result == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("descriptor {} not {:?} in time", fd, interest),
                ));
            }

            // POLLHUP/POLLERR also count as ready: the retried call reports them
            return Ok(());
        }
    }
}

impl Scheduler for PollScheduler {
    fn wait_readable(&self, fd: RawFd) -> io::Result<()> {
        self.poll(fd, Interest::Readable)
    }

    fn wait_writable(&self, fd: RawFd) -> io::Result<()> {
        self.poll(fd, Interest::Writable)
    }
}
