//! Raw transports
//!
//! A transport is the plain byte stream beneath the TLS layer. It is used
//! directly before the handshake and after a clean TLS shutdown, and its
//! descriptor is the key the scheduler waits on.

use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::os::fd::AsRawFd;
use std::os::unix::net::UnixStream;

/// Byte stream that can sit underneath a TLS session
pub trait Transport: Read + Write + AsRawFd {
    /// Switch the descriptor between blocking and non-blocking mode
    fn set_nonblocking(&self, nonblocking: bool) -> io::Result<()>;

    /// Shut down one or both halves of the stream
    fn shutdown(&self, how: Shutdown) -> io::Result<()>;

    /// New handle to the same open stream
    fn duplicate(&self) -> io::Result<Self>
    where
        Self: Sized;
}

impl Transport for TcpStream {
    fn set_nonblocking(&self, nonblocking: bool) -> io::Result<()> {
        TcpStream::set_nonblocking(self, nonblocking)
    }

    fn shutdown(&self, how: Shutdown) -> io::Result<()> {
        TcpStream::shutdown(self, how)
    }

    fn duplicate(&self) -> io::Result<Self> {
        TcpStream::try_clone(self)
    }
}

impl Transport for UnixStream {
    fn set_nonblocking(&self, nonblocking: bool) -> io::Result<()> {
        UnixStream::set_nonblocking(self, nonblocking)
    }

    fn shutdown(&self, how: Shutdown) -> io::Result<()> {
        UnixStream::shutdown(self, how)
    }

    fn duplicate(&self) -> io::Result<Self> {
        UnixStream::try_clone(self)
    }
}

impl Transport for socket2::Socket {
    fn set_nonblocking(&self, nonblocking: bool) -> io::Result<()> {
        socket2::Socket::set_nonblocking(self, nonblocking)
    }

    fn shutdown(&self, how: Shutdown) -> io::Result<()> {
        socket2::Socket::shutdown(self, how)
    }

    fn duplicate(&self) -> io::Result<Self> {
        socket2::Socket::try_clone(self)
    }
}
