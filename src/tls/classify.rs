//! Error classification
//!
//! Every failed TLS engine call is mapped to exactly one `Classification`.
//! The retry driver matches on it instead of inspecting engine errors.
//!
//! The OpenSSL error queue is thread-local and reading it consumes it. The
//! `openssl` crate drains it once when it builds an `ssl::Error`; the
//! classifier reads that captured stack once and packages it into the
//! `Fatal` payload, so nothing downstream touches the queue again.

use crate::error::Fault;
use openssl::ssl::{self, ErrorCode};
use std::io;

/// `ERR_LIB_SSL`
pub const LIB_SSL: i32 = 20;

/// `SSL_R_UNEXPECTED_EOF_WHILE_READING` (OpenSSL 3.x)
pub const REASON_UNEXPECTED_EOF: i32 = 294;

/// Outcome of a TLS engine call that did not complete
#[derive(Debug)]
pub enum Classification {
    /// The engine needs the descriptor to become readable
    RetryRead,
    /// The engine needs the descriptor to become writable
    RetryWrite,
    /// Close-notify received: orderly end of stream
    ZeroReturn,
    /// Unrecoverable transport or protocol fault
    Fatal(Fault),
    /// Peer dropped the transport without close-notify
    FatalEofAlias,
    /// Not produced by the engine's I/O path; propagated unchanged
    Unrelated(io::Error),
}

impl Classification {
    /// Whether a retry after waiting can make progress
    pub fn is_retry(&self) -> bool {
        matches!(self, Classification::RetryRead | Classification::RetryWrite)
    }

    /// Whether the engine reported end of stream
    pub fn is_eof(&self) -> bool {
        matches!(
            self,
            Classification::ZeroReturn | Classification::FatalEofAlias
        )
    }
}

/// Classify an error from an OpenSSL call
pub fn classify(err: ssl::Error) -> Classification {
    let code = err.code();

    if code == ErrorCode::WANT_READ {
        return Classification::RetryRead;
    }
    if code == ErrorCode::WANT_WRITE {
        return Classification::RetryWrite;
    }
    if code == ErrorCode::ZERO_RETURN {
        return Classification::ZeroReturn;
    }

    if code == ErrorCode::SYSCALL {
        if let Some(io_err) = err.io_error() {
            return match io_err.kind() {
                io::ErrorKind::WouldBlock => Classification::RetryRead,
                io::ErrorKind::UnexpectedEof => Classification::FatalEofAlias,
                _ => Classification::Fatal(Fault::syscall(io_err)),
            };
        }

        let queued = err.ssl_error().map(|stack| stack.errors().len()).unwrap_or(0);
        if queued == 0 {
            // OpenSSL 1.1: EOF from the transport with nothing queued
            return Classification::FatalEofAlias;
        }
        return Classification::Fatal(fault_from_stack(&err));
    }

    if code == ErrorCode::SSL {
        let first = err.ssl_error().and_then(|stack| stack.errors().first());
        if let Some(first) = first {
            if first.library_code() == LIB_SSL && first.reason_code() == REASON_UNEXPECTED_EOF {
                return Classification::FatalEofAlias;
            }
        }
        return Classification::Fatal(fault_from_stack(&err));
    }

    Classification::Unrelated(io::Error::new(io::ErrorKind::Other, err.to_string()))
}

/// Classify a raw transport error from pass-through I/O
pub fn classify_io(err: io::Error) -> Classification {
    match err.kind() {
        io::ErrorKind::WouldBlock => Classification::RetryRead,
        _ => Classification::Unrelated(err),
    }
}

/// Same as `classify_io` but waits for writability
pub fn classify_io_write(err: io::Error) -> Classification {
    match err.kind() {
        io::ErrorKind::WouldBlock => Classification::RetryWrite,
        _ => Classification::Unrelated(err),
    }
}

fn fault_from_stack(err: &ssl::Error) -> Fault {
    let stack = err.ssl_error();
    let first = stack.and_then(|stack| stack.errors().first());

    let message = match stack {
        Some(stack) if !stack.errors().is_empty() => stack.to_string(),
        _ => err.to_string(),
    };

    match first {
        Some(first) => Fault::protocol(first.library_code(), first.reason_code(), message),
        None => Fault {
            kind: crate::error::FaultKind::Protocol,
            library: None,
            reason: None,
            io_kind: None,
            message,
        },
    }
}
