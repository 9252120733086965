//! Session operations abstraction
//!
//! `SessionOps` is the stream surface application code programs against:
//! read, scatter/gather write, directional shutdown, close, and bulk copy
//! from a source. `tls::TlsSession` is its implementation.

use crate::copy::{self, Source};
use crate::error::Result;
use std::io::IoSlice;
use std::net::Shutdown;

/// Bidirectional byte stream operations
pub trait SessionOps {
    /// Read into `buf`
    ///
    /// `Ok(0)` for a non-empty `buf` means end of stream. An empty `buf`
    /// returns `Ok(0)` without touching the session.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Write every buffer in order, returning the bytes actually sent
    ///
    /// Returns less than the total only when the peer ended the stream.
    fn write_vectored(&mut self, bufs: &[IoSlice<'_>]) -> Result<usize>;

    /// Shut down one direction of the session
    fn shutdown(&mut self, how: Shutdown) -> Result<()>;

    /// Shut down both directions and release the transport
    fn close(&mut self) -> Result<()>;

    /// Forward `source` into this session until it is exhausted
    fn copy_from<S: Source + ?Sized>(&mut self, source: &mut S) -> Result<u64>
    where
        Self: Sized,
    {
        copy::copy(self, source)
    }
}

impl<T: SessionOps + ?Sized> SessionOps for &mut T {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).read(buf)
    }

    fn write_vectored(&mut self, bufs: &[IoSlice<'_>]) -> Result<usize> {
        (**self).write_vectored(bufs)
    }

    fn shutdown(&mut self, how: Shutdown) -> Result<()> {
        (**self).shutdown(how)
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}
