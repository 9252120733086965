//! Retry driver
//!
//! Runs one engine call, and whenever the classifier says the engine is
//! waiting on the transport, suspends on the descriptor and calls again.
//! The loop is bounded: a descriptor that keeps reporting ready while the
//! engine never progresses ends in `Error::TooManyRetries`.

use super::classify::Classification;
use super::state::SessionState;
use crate::error::{Error, Result};
use crate::scheduler::{Interest, Scheduler};
use std::os::fd::RawFd;

/// Default ceiling on attempts per driven operation
pub const MAX_RETRIES: usize = 64;

/// How the engine ended the stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EofKind {
    /// Close-notify received
    CloseNotify,
    /// Transport closed without close-notify
    Unexpected,
}

/// Non-error result of a driven operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress<T> {
    Done(T),
    Eof(EofKind),
}

/// Drives one engine operation to completion
pub struct RetryDriver<'a, W: ?Sized> {
    scheduler: &'a W,
    fd: RawFd,
    limit: usize,
}

impl<'a, W: Scheduler + ?Sized> RetryDriver<'a, W> {
    pub fn new(scheduler: &'a W, fd: RawFd) -> Self {
        RetryDriver {
            scheduler,
            fd,
            limit: MAX_RETRIES,
        }
    }

    /// Override the attempt ceiling; at least one attempt is always made
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit.max(1);
        self
    }

    /// Run `op` until it completes, ends the stream or fails
    ///
    /// A fatal classification moves `state` to `ShutdownError` before the
    /// error is returned. Waits that fail (timeouts included) return the
    /// scheduler's error and leave `state` as it was.
    pub fn run<T, F>(&self, state: &mut SessionState, mut op: F) -> Result<Progress<T>>
    where
        F: FnMut() -> std::result::Result<T, Classification>,
    {
        for attempt in 1..=self.limit {
            let interest = match op() {
                Ok(value) => return Ok(Progress::Done(value)),
                Err(Classification::RetryRead) => Interest::Readable,
                Err(Classification::RetryWrite) => Interest::Writable,
                Err(Classification::ZeroReturn) => return Ok(Progress::Eof(EofKind::CloseNotify)),
                Err(Classification::FatalEofAlias) => {
                    return Ok(Progress::Eof(EofKind::Unexpected))
                }
                Err(Classification::Fatal(fault)) => return Err(state.fail(fault)),
                Err(Classification::Unrelated(err)) => return Err(Error::Io(err)),
            };

            log::trace!(
                "[retry] attempt {} on fd {} waits for {:?}",
                attempt,
                self.fd,
                interest
            );
            self.scheduler.wait(self.fd, interest)?;
        }

        log::warn!(
            "[retry] fd {} made no progress after {} attempts",
            self.fd,
            self.limit
        );
        Err(Error::TooManyRetries(self.limit))
    }
}
