//! Packed micro-formats.
//!
//! Each format wraps a validated byte buffer. Construction walks the whole
//! buffer once; iteration then decodes entries in place and yields
//! [`RawRef`](rdbkit_codec::RawRef)s that borrow from it.
//!
//! Offsets in errors raised here are relative to the start of the buffer.

pub mod intset;
pub mod listpack;
pub mod ziplist;
pub mod zipmap;

pub use intset::{Intset, IntsetIter};
pub use listpack::{Listpack, ListpackIter};
pub use ziplist::{Ziplist, ZiplistIter};
pub use zipmap::{Zipmap, ZipmapIter};

use rdbkit_codec::{RdbError, Result};

/// Bounds-checked forward reader over a packed buffer.
pub(crate) struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
    limit: usize,
    format: &'static str,
}

impl<'a> Cursor<'a> {
    /// Reads `buf[pos..limit]`.
    pub(crate) fn new(buf: &'a [u8], pos: usize, limit: usize, format: &'static str) -> Self {
        Self {
            buf,
            pos,
            limit: limit.min(buf.len()),
            format,
        }
    }

    pub(crate) fn pos(&self) -> usize {
        self.pos
    }

    pub(crate) fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.limit.saturating_sub(self.pos) {
            return Err(RdbError::corrupted(
                self.pos as u64,
                format!(
                    "{} field of {n} bytes runs past the end of the {}",
                    self.format, self.format
                ),
            ));
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub(crate) fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub(crate) fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }
}

/// Reads a little-endian `u32` header field. The caller checks bounds.
pub(crate) fn header_u32(buf: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

/// Reads a little-endian `u16` header field. The caller checks bounds.
pub(crate) fn header_u16(buf: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([buf[at], buf[at + 1]])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_stops_at_limit() {
        let buf = [1u8, 2, 3, 4, 5];
        let mut cur = Cursor::new(&buf, 1, 4, "ziplist");
        assert_eq!(cur.u8().unwrap(), 2);
        assert_eq!(cur.array::<2>().unwrap(), [3, 4]);
        assert_eq!(cur.pos(), 4);
        let err = cur.u8().unwrap_err();
        assert!(matches!(err, RdbError::CorruptedPayload { offset: 4, .. }));
    }

    #[test]
    fn test_cursor_huge_take() {
        let buf = [0u8; 4];
        let mut cur = Cursor::new(&buf, 0, 4, "listpack");
        assert!(cur.take(usize::MAX).is_err());
        assert_eq!(cur.pos(), 0);
    }
}
