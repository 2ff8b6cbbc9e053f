//! Ziplist: a doubly traversable packed list.
//!
//! ```text
//! +-------------+------------+-----------+-------+-----+-------+------+
//! | zlbytes u32 | zltail u32 | zllen u16 | entry | ... | entry | 0xFF |
//! +-------------+------------+-----------+-------+-----+-------+------+
//!
//! entry: <prevlen> <encoding> <payload>
//!
//! prevlen   0..=253                      previous entry size
//!           0xFE [u32 LE]                previous entry size
//!
//! encoding  00pppppp                     string, 6-bit length
//!           01pppppp qqqqqqqq            string, 14-bit length (BE)
//!           10000000 [u32 BE]            string, 32-bit length
//!           0xC0 / 0xD0 / 0xE0           int16 / int32 / int64
//!           0xF0 / 0xFE                  int24 / int8
//!           0xF1..=0xFD                  immediate 0..=12
//! ```
//!
//! `zllen` saturates at 65535, in which case the count is only known by
//! walking. Forward iteration ignores `prevlen`; validation checks it.

use super::{header_u16, header_u32, Cursor};
use bytes::Bytes;
use rdbkit_codec::{parse_canonical_i64, RawRef, RdbError, Result};
use std::fmt;

const HEADER_SIZE: usize = 10;
const END: u8 = 0xFF;
const BIG_PREVLEN: u8 = 0xFE;
const UNKNOWN_COUNT: u16 = u16::MAX;

const INT_16: u8 = 0xC0;
const INT_32: u8 = 0xD0;
const INT_64: u8 = 0xE0;
const INT_24: u8 = 0xF0;
const INT_8: u8 = 0xFE;
const IMM_MIN: u8 = 0xF1;
const IMM_MAX: u8 = 0xFD;

/// Strings longer than this are never tried as integers.
const MAX_INT_STRING: usize = 32;

/// A validated ziplist blob.
#[derive(Clone, PartialEq, Eq)]
pub struct Ziplist {
    buf: Bytes,
    len: usize,
}

struct Entry<'a> {
    value: RawRef<'a>,
    prevlen: usize,
    size: usize,
}

impl Ziplist {
    /// Validates `buf` as a ziplist, walking every entry.
    pub fn new(buf: Bytes) -> Result<Self> {
        if buf.len() < HEADER_SIZE + 1 {
            return Err(RdbError::corrupted(
                0,
                format!("ziplist of {} bytes is shorter than its header", buf.len()),
            ));
        }
        let zlbytes = header_u32(&buf, 0) as usize;
        if zlbytes != buf.len() {
            return Err(RdbError::corrupted(
                0,
                format!("ziplist declares {zlbytes} bytes, blob holds {}", buf.len()),
            ));
        }
        let end = buf.len() - 1;
        if buf[end] != END {
            return Err(RdbError::corrupted(end as u64, "ziplist is not terminated"));
        }

        let mut pos = HEADER_SIZE;
        let mut last = HEADER_SIZE;
        let mut prev_size = 0;
        let mut count = 0;
        while pos < end {
            let entry = parse_entry(&buf, pos)?;
            if entry.prevlen != prev_size {
                return Err(RdbError::corrupted(
                    pos as u64,
                    format!(
                        "entry records previous size {}, actual {prev_size}",
                        entry.prevlen
                    ),
                ));
            }
            last = pos;
            prev_size = entry.size;
            pos += entry.size;
            count += 1;
        }

        let zltail = header_u32(&buf, 4) as usize;
        if zltail != last {
            return Err(RdbError::corrupted(
                4,
                format!("ziplist tail offset {zltail} does not point at last entry {last}"),
            ));
        }
        let zllen = header_u16(&buf, 8);
        if zllen != UNKNOWN_COUNT && zllen as usize != count {
            return Err(RdbError::corrupted(
                8,
                format!("ziplist declares {zllen} entries, found {count}"),
            ));
        }
        Ok(Self { buf, len: count })
    }

    /// Encodes `entries` as a ziplist. Canonical decimal strings are stored
    /// as integers.
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = RawRef<'a>>) -> Self {
        let mut buf = vec![0u8; HEADER_SIZE];
        let mut tail = HEADER_SIZE;
        let mut prev_size = 0;
        let mut count = 0usize;
        for entry in entries {
            let start = buf.len();
            tail = start;
            encode_prevlen(&mut buf, prev_size);
            encode_value(&mut buf, entry);
            prev_size = buf.len() - start;
            count += 1;
        }
        buf.push(END);

        let total = buf.len() as u32;
        buf[0..4].copy_from_slice(&total.to_le_bytes());
        buf[4..8].copy_from_slice(&(tail as u32).to_le_bytes());
        let zllen = count.min(UNKNOWN_COUNT as usize) as u16;
        buf[8..10].copy_from_slice(&zllen.to_le_bytes());
        Self {
            buf: Bytes::from(buf),
            len: count,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn iter(&self) -> ZiplistIter<'_> {
        ZiplistIter {
            buf: &self.buf,
            pos: HEADER_SIZE,
            remaining: self.len,
            failed: false,
        }
    }

    /// The encoded blob.
    pub fn as_bytes(&self) -> &Bytes {
        &self.buf
    }
}

impl fmt::Debug for Ziplist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ziplist")
            .field("len", &self.len)
            .field("bytes", &self.buf.len())
            .finish()
    }
}

fn parse_entry(buf: &[u8], pos: usize) -> Result<Entry<'_>> {
    let mut cur = Cursor::new(buf, pos, buf.len() - 1, "ziplist");
    let prevlen = match cur.u8()? {
        END => {
            return Err(RdbError::corrupted(
                pos as u64,
                "ziplist end marker before the last entry",
            ))
        }
        BIG_PREVLEN => u32::from_le_bytes(cur.array()?) as usize,
        n => n as usize,
    };

    let tag = cur.u8()?;
    let value = match tag >> 6 {
        0 => RawRef::Bytes(cur.take((tag & 0x3F) as usize)?),
        1 => {
            let low = cur.u8()? as usize;
            RawRef::Bytes(cur.take((((tag & 0x3F) as usize) << 8) | low)?)
        }
        2 => {
            let len = u32::from_be_bytes(cur.array()?) as usize;
            RawRef::Bytes(cur.take(len)?)
        }
        _ => match tag {
            INT_16 => RawRef::Int(i16::from_le_bytes(cur.array()?) as i64),
            INT_32 => RawRef::Int(i32::from_le_bytes(cur.array()?) as i64),
            INT_64 => RawRef::Int(i64::from_le_bytes(cur.array()?)),
            INT_24 => {
                let [a, b, c] = cur.array()?;
                RawRef::Int((i32::from_le_bytes([0, a, b, c]) >> 8) as i64)
            }
            INT_8 => RawRef::Int(i8::from_le_bytes(cur.array()?) as i64),
            IMM_MIN..=IMM_MAX => RawRef::Int(((tag & 0x0F) - 1) as i64),
            other => {
                return Err(RdbError::UnsupportedEncoding {
                    context: "ziplist entry",
                    tag: other as u64,
                })
            }
        },
    };

    Ok(Entry {
        value,
        prevlen,
        size: cur.pos() - pos,
    })
}

fn encode_prevlen(buf: &mut Vec<u8>, prev_size: usize) {
    if prev_size < BIG_PREVLEN as usize {
        buf.push(prev_size as u8);
    } else {
        buf.push(BIG_PREVLEN);
        buf.extend_from_slice(&(prev_size as u32).to_le_bytes());
    }
}

fn encode_value(buf: &mut Vec<u8>, value: RawRef<'_>) {
    let b = match value {
        RawRef::Int(v) => return encode_int(buf, v),
        RawRef::Bytes(b) => b,
    };
    if b.len() <= MAX_INT_STRING {
        if let Some(v) = parse_canonical_i64(b) {
            return encode_int(buf, v);
        }
    }
    let len = b.len();
    if len < 1 << 6 {
        buf.push(len as u8);
    } else if len < 1 << 14 {
        buf.extend_from_slice(&[0x40 | (len >> 8) as u8, len as u8]);
    } else {
        buf.push(0x80);
        buf.extend_from_slice(&(len as u32).to_be_bytes());
    }
    buf.extend_from_slice(b);
}

fn encode_int(buf: &mut Vec<u8>, v: i64) {
    if (0..=12).contains(&v) {
        buf.push(IMM_MIN + v as u8);
    } else if let Ok(v) = i8::try_from(v) {
        buf.push(INT_8);
        buf.extend_from_slice(&v.to_le_bytes());
    } else if let Ok(v) = i16::try_from(v) {
        buf.push(INT_16);
        buf.extend_from_slice(&v.to_le_bytes());
    } else if (-(1 << 23)..1 << 23).contains(&v) {
        buf.push(INT_24);
        buf.extend_from_slice(&((v as i32) << 8).to_le_bytes()[1..]);
    } else if let Ok(v) = i32::try_from(v) {
        buf.push(INT_32);
        buf.extend_from_slice(&v.to_le_bytes());
    } else {
        buf.push(INT_64);
        buf.extend_from_slice(&v.to_le_bytes());
    }
}

/// Forward walk over a [`Ziplist`].
///
/// A structural fault is returned once; the iterator is exhausted after it.
#[derive(Debug, Clone)]
pub struct ZiplistIter<'a> {
    buf: &'a [u8],
    pos: usize,
    remaining: usize,
    failed: bool,
}

impl<'a> Iterator for ZiplistIter<'a> {
    type Item = Result<RawRef<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.pos + 1 >= self.buf.len() {
            return None;
        }
        match parse_entry(self.buf, self.pos) {
            Ok(entry) => {
                self.pos += entry.size;
                self.remaining = self.remaining.saturating_sub(1);
                Some(Ok(entry.value))
            }
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.failed {
            (0, Some(0))
        } else {
            (0, Some(self.remaining))
        }
    }
}
