//! Checksummed byte streams.
//!
//! [`Rio`] wraps any [`Read`] source and [`RioWriter`] any [`Write`] sink.
//! Both track the current offset and a running CRC64 over exactly the bytes
//! that crossed the boundary, in order. A read or write either completes and
//! advances offset and checksum together, or fails and advances neither.

use crate::crc64::crc64;
use crate::error::{RdbError, Result};
use bytes::Bytes;
use std::io::{ErrorKind, Read, Write};

/// Largest buffer grown in one step for a length taken from the stream.
///
/// Lengths are untrusted, so a declared size is only materialized as the
/// bytes actually arrive.
const READ_CHUNK: usize = 64 * 1024;

/// Reading side of an RDB stream.
pub struct Rio<R> {
    inner: R,
    offset: u64,
    checksum: u64,
}

impl<R: Read> Rio<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            offset: 0,
            checksum: 0,
        }
    }

    /// Returns the number of bytes consumed so far.
    pub fn tell(&self) -> u64 {
        self.offset
    }

    /// Returns the CRC64 of every byte consumed so far.
    pub fn checksum(&self) -> u64 {
        self.checksum
    }

    /// Reading streams have nothing to flush.
    pub fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    /// Returns a reference to the underlying source.
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Consumes the stream, returning the underlying source.
    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Reads exactly `n` bytes.
    pub fn read(&mut self, n: usize) -> Result<Bytes> {
        let mut buf = Vec::with_capacity(n.min(READ_CHUNK));
        while buf.len() < n {
            let start = buf.len();
            let step = (n - start).min(READ_CHUNK);
            buf.resize(start + step, 0);
            let got = self.fill(&mut buf[start..])?;
            if got < step {
                return Err(RdbError::UnexpectedEof {
                    offset: self.offset,
                    needed: n,
                    available: start + got,
                });
            }
        }
        self.update_checksum(&buf);
        Ok(Bytes::from(buf))
    }

    /// Fills `buf` completely.
    pub fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        let got = self.fill(buf)?;
        if got < buf.len() {
            return Err(RdbError::UnexpectedEof {
                offset: self.offset,
                needed: buf.len(),
                available: got,
            });
        }
        self.update_checksum(buf);
        Ok(())
    }

    /// Reads a fixed-size array.
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let [b] = self.read_array::<1>()?;
        Ok(b)
    }

    /// Folds freshly consumed bytes into the offset and running checksum.
    fn update_checksum(&mut self, buf: &[u8]) {
        self.checksum = crc64(self.checksum, buf);
        self.offset += buf.len() as u64;
    }

    /// Reads until `buf` is full or the source is exhausted.
    fn fill(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(filled)
    }
}

/// Write-through side of an RDB stream.
pub struct RioWriter<W> {
    inner: W,
    offset: u64,
    checksum: u64,
}

impl<W: Write> RioWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            offset: 0,
            checksum: 0,
        }
    }

    /// Returns the number of bytes written so far.
    pub fn tell(&self) -> u64 {
        self.offset
    }

    /// Returns the CRC64 of every byte written so far.
    pub fn checksum(&self) -> u64 {
        self.checksum
    }

    /// Writes all of `buf`.
    pub fn write(&mut self, buf: &[u8]) -> Result<()> {
        self.inner.write_all(buf)?;
        self.checksum = crc64(self.checksum, buf);
        self.offset += buf.len() as u64;
        Ok(())
    }

    pub fn write_u8(&mut self, b: u8) -> Result<()> {
        self.write(&[b])
    }

    /// Flushes the underlying sink.
    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }

    /// Returns a reference to the underlying sink.
    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Consumes the stream, returning the underlying sink.
    pub fn into_inner(self) -> W {
        self.inner
    }
}
