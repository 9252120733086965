//! Bulk copy into a session
//!
//! `copy` forwards a source into a session until the source is exhausted.
//! Sources that can lend their internal buffers (`DirectSource`) are written
//! straight from those buffers; any other source is read through a staging
//! buffer of `COPY_BUFFER_SIZE` bytes.

use crate::error::{Error, Result};
use crate::session::SessionOps;
use bytes::{Buf, Bytes};
use std::collections::VecDeque;
use std::io::{self, BufRead, IoSlice, Read};

/// Staging buffer size for sources without a direct path
pub const COPY_BUFFER_SIZE: usize = 4096;

/// Result of reading from a source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chunk {
    /// `n` bytes were read; zero is a legitimate empty read
    Data(usize),
    /// The source is exhausted
    End,
}

/// Source that lends its own buffers
pub trait DirectSource {
    /// Next buffered chunk, or `None` once exhausted
    ///
    /// The chunk is considered consumed on the next call.
    fn next_chunk(&mut self) -> io::Result<Option<&[u8]>>;
}

/// Readable source for [`copy`]
pub trait Source {
    /// Read into `buf`
    fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<Chunk>;

    /// Direct access to internal buffers, if the source has them
    fn direct(&mut self) -> Option<&mut dyn DirectSource> {
        None
    }
}

impl<S: Source + ?Sized> Source for &mut S {
    fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<Chunk> {
        (**self).read_chunk(buf)
    }

    fn direct(&mut self) -> Option<&mut dyn DirectSource> {
        (**self).direct()
    }
}

/// Forward `src` into `dst` until `src` is exhausted
///
/// Returns the number of bytes forwarded. A destination that accepts fewer
/// bytes than offered (its peer ended the stream) fails with `WriteZero`.
pub fn copy<D, S>(dst: &mut D, src: &mut S) -> Result<u64>
where
    D: SessionOps + ?Sized,
    S: Source + ?Sized,
{
    let mut total = 0u64;

    if let Some(direct) = src.direct() {
        while let Some(chunk) = direct.next_chunk()? {
            send(dst, chunk)?;
            total += chunk.len() as u64;
        }
        log::debug!("[copy] forwarded {} bytes from borrowed buffers", total);
        return Ok(total);
    }

    let mut buf = vec![0u8; COPY_BUFFER_SIZE];
    loop {
        match src.read_chunk(&mut buf)? {
            Chunk::End => break,
            Chunk::Data(n) => {
                send(dst, &buf[..n])?;
                total += n as u64;
            }
        }
    }

    log::debug!("[copy] forwarded {} bytes through staging buffer", total);
    Ok(total)
}

fn send<D: SessionOps + ?Sized>(dst: &mut D, chunk: &[u8]) -> Result<()> {
    let n = dst.write_vectored(&[IoSlice::new(chunk)])?;
    if n < chunk.len() {
        return Err(Error::Io(io::Error::new(
            io::ErrorKind::WriteZero,
            format!("destination accepted {} of {} bytes", n, chunk.len()),
        )));
    }
    Ok(())
}

/// Source over any `Read`; a zero-length read ends it
pub struct ReadSource<R>(pub R);

impl<R: Read> Source for ReadSource<R> {
    fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<Chunk> {
        loop {
            match self.0.read(buf) {
                Ok(0) => return Ok(Chunk::End),
                Ok(n) => return Ok(Chunk::Data(n)),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

/// Source over a `BufRead`, lending its internal buffer
pub struct BufSource<R> {
    inner: R,
    pending: usize,
}

impl<R: BufRead> BufSource<R> {
    pub fn new(inner: R) -> Self {
        BufSource { inner, pending: 0 }
    }

    pub fn into_inner(mut self) -> R {
        self.inner.consume(self.pending);
        self.inner
    }
}

impl<R: BufRead> DirectSource for BufSource<R> {
    fn next_chunk(&mut self) -> io::Result<Option<&[u8]>> {
        self.inner.consume(self.pending);
        self.pending = 0;

        let buf = self.inner.fill_buf()?;
        if buf.is_empty() {
            return Ok(None);
        }
        self.pending = buf.len();
        Ok(Some(buf))
    }
}

impl<R: BufRead> Source for BufSource<R> {
    fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<Chunk> {
        self.inner.consume(self.pending);
        self.pending = 0;
        ReadSource(&mut self.inner).read_chunk(buf)
    }

    fn direct(&mut self) -> Option<&mut dyn DirectSource> {
        Some(self)
    }
}

/// Source over a queue of shared buffers
#[derive(Debug, Default)]
pub struct ChunkSource {
    chunks: VecDeque<Bytes>,
    current: Bytes,
}

impl ChunkSource {
    pub fn new() -> Self {
        ChunkSource::default()
    }

    /// Queue a chunk; empty chunks are kept as empty reads
    pub fn push(&mut self, chunk: impl Into<Bytes>) {
        self.chunks.push_back(chunk.into());
    }

    /// Bytes not yet handed out
    pub fn remaining(&self) -> usize {
        self.chunks.iter().map(Bytes::len).sum()
    }
}

impl<B: Into<Bytes>> FromIterator<B> for ChunkSource {
    fn from_iter<I: IntoIterator<Item = B>>(iter: I) -> Self {
        ChunkSource {
            chunks: iter.into_iter().map(Into::into).collect(),
            current: Bytes::new(),
        }
    }
}

impl DirectSource for ChunkSource {
    fn next_chunk(&mut self) -> io::Result<Option<&[u8]>> {
        match self.chunks.pop_front() {
            Some(chunk) => {
                self.current = chunk;
                Ok(Some(&self.current[..]))
            }
            None => {
                self.current = Bytes::new();
                Ok(None)
            }
        }
    }
}

impl Source for ChunkSource {
    fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<Chunk> {
        let Some(front) = self.chunks.front_mut() else {
            return Ok(Chunk::End);
        };

        let n = front.len().min(buf.len());
        buf[..n].copy_from_slice(&front[..n]);
        front.advance(n);
        if front.is_empty() {
            self.chunks.pop_front();
        }
        Ok(Chunk::Data(n))
    }

    fn direct(&mut self) -> Option<&mut dyn DirectSource> {
        Some(self)
    }
}
