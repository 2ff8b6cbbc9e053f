//! Listpack: the successor of the ziplist.
//!
//! ```text
//! +-----------+-----------+-------+-----+-------+------+
//! | total u32 | count u16 | entry | ... | entry | 0xFF |
//! +-----------+-----------+-------+-----+-------+------+
//!
//! entry: <encoding+payload> <backlen>
//!
//! 0xxxxxxx                       7-bit unsigned integer
//! 10LLLLLL [L bytes]             string, 6-bit length
//! 110xxxxx yyyyyyyy              13-bit signed integer
//! 1110LLLL LLLLLLLL [L bytes]    string, 12-bit length
//! 0xF0 [u32 LE] [L bytes]        string, 32-bit length
//! 0xF1 / 0xF2 / 0xF3 / 0xF4      int16 / int24 / int32 / int64 (LE)
//! ```
//!
//! `backlen` is the size of encoding+payload written in 1 to 5 bytes of
//! 7 bits each, readable from its last byte backwards.

use super::{header_u16, header_u32, Cursor};
use bytes::Bytes;
use rdbkit_codec::{parse_canonical_i64, RawRef, RdbError, Result};
use std::fmt;

const HEADER_SIZE: usize = 6;
const END: u8 = 0xFF;
const UNKNOWN_COUNT: u16 = u16::MAX;

const STR_32: u8 = 0xF0;
const INT_16: u8 = 0xF1;
const INT_24: u8 = 0xF2;
const INT_32: u8 = 0xF3;
const INT_64: u8 = 0xF4;

/// A validated listpack blob.
#[derive(Clone, PartialEq, Eq)]
pub struct Listpack {
    buf: Bytes,
    len: usize,
}

impl Listpack {
    /// Validates `buf` as a listpack, walking every entry and checking its
    /// back length.
    pub fn new(buf: Bytes) -> Result<Self> {
        if buf.len() < HEADER_SIZE + 1 {
            return Err(RdbError::corrupted(
                0,
                format!("listpack of {} bytes is shorter than its header", buf.len()),
            ));
        }
        let total = header_u32(&buf, 0) as usize;
        if total != buf.len() {
            return Err(RdbError::corrupted(
                0,
                format!("listpack declares {total} bytes, blob holds {}", buf.len()),
            ));
        }
        let end = buf.len() - 1;
        if buf[end] != END {
            return Err(RdbError::corrupted(end as u64, "listpack is not terminated"));
        }

        let mut pos = HEADER_SIZE;
        let mut count = 0;
        while pos < end {
            let (_, size) = parse_entry(&buf, pos)?;
            pos += size;
            count += 1;
        }

        let declared = header_u16(&buf, 4);
        if declared != UNKNOWN_COUNT && declared as usize != count {
            return Err(RdbError::corrupted(
                4,
                format!("listpack declares {declared} entries, found {count}"),
            ));
        }
        Ok(Self { buf, len: count })
    }

    /// Encodes `entries` as a listpack. Canonical decimal strings are stored
    /// as integers.
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = RawRef<'a>>) -> Self {
        let mut buf = vec![0u8; HEADER_SIZE];
        let mut count = 0usize;
        for entry in entries {
            let start = buf.len();
            encode_value(&mut buf, entry);
            let (backlen, n) = encode_backlen(buf.len() - start);
            buf.extend_from_slice(&backlen[..n]);
            count += 1;
        }
        buf.push(END);

        let total = buf.len() as u32;
        buf[0..4].copy_from_slice(&total.to_le_bytes());
        let declared = count.min(UNKNOWN_COUNT as usize) as u16;
        buf[4..6].copy_from_slice(&declared.to_le_bytes());
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

    pub fn iter(&self) -> ListpackIter<'_> {
        ListpackIter {
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

impl fmt::Debug for Listpack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listpack")
            .field("len", &self.len)
            .field("bytes", &self.buf.len())
            .finish()
    }
}

/// Decodes the entry at `pos`, returning it and its total size.
fn parse_entry(buf: &[u8], pos: usize) -> Result<(RawRef<'_>, usize)> {
    let mut cur = Cursor::new(buf, pos, buf.len() - 1, "listpack");
    let tag = cur.u8()?;
    let value = if tag & 0x80 == 0 {
        RawRef::Int(tag as i64)
    } else if tag & 0xC0 == 0x80 {
        RawRef::Bytes(cur.take((tag & 0x3F) as usize)?)
    } else if tag & 0xE0 == 0xC0 {
        let uval = (((tag & 0x1F) as i64) << 8) | cur.u8()? as i64;
        RawRef::Int(if uval >= 1 << 12 { uval - (1 << 13) } else { uval })
    } else if tag & 0xF0 == 0xE0 {
        let len = (((tag & 0x0F) as usize) << 8) | cur.u8()? as usize;
        RawRef::Bytes(cur.take(len)?)
    } else {
        match tag {
            STR_32 => {
                let len = u32::from_le_bytes(cur.array()?) as usize;
                RawRef::Bytes(cur.take(len)?)
            }
            INT_16 => RawRef::Int(i16::from_le_bytes(cur.array()?) as i64),
            INT_24 => {
                let [a, b, c] = cur.array()?;
                RawRef::Int((i32::from_le_bytes([0, a, b, c]) >> 8) as i64)
            }
            INT_32 => RawRef::Int(i32::from_le_bytes(cur.array()?) as i64),
            INT_64 => RawRef::Int(i64::from_le_bytes(cur.array()?)),
            END => {
                return Err(RdbError::corrupted(
                    pos as u64,
                    "listpack end marker before the last entry",
                ))
            }
            other => {
                return Err(RdbError::UnsupportedEncoding {
                    context: "listpack entry",
                    tag: other as u64,
                })
            }
        }
    };

    let entry_len = cur.pos() - pos;
    let (expected, n) = encode_backlen(entry_len);
    let backlen_at = cur.pos();
    if cur.take(n)? != &expected[..n] {
        return Err(RdbError::corrupted(
            backlen_at as u64,
            format!("listpack back length does not encode entry size {entry_len}"),
        ));
    }
    Ok((value, cur.pos() - pos))
}

fn encode_backlen(len: usize) -> ([u8; 5], usize) {
    let l = len as u64;
    if l <= 127 {
        ([l as u8, 0, 0, 0, 0], 1)
    } else if l < 16383 {
        ([(l >> 7) as u8, (l & 127) as u8 | 128, 0, 0, 0], 2)
    } else if l < 2097151 {
        (
            [
                (l >> 14) as u8,
                ((l >> 7) & 127) as u8 | 128,
                (l & 127) as u8 | 128,
                0,
                0,
            ],
            3,
        )
    } else if l < 268435455 {
        (
            [
                (l >> 21) as u8,
                ((l >> 14) & 127) as u8 | 128,
                ((l >> 7) & 127) as u8 | 128,
                (l & 127) as u8 | 128,
                0,
            ],
            4,
        )
    } else {
        (
            [
                (l >> 28) as u8,
                ((l >> 21) & 127) as u8 | 128,
                ((l >> 14) & 127) as u8 | 128,
                ((l >> 7) & 127) as u8 | 128,
                (l & 127) as u8 | 128,
            ],
            5,
        )
    }
}

fn encode_value(buf: &mut Vec<u8>, value: RawRef<'_>) {
    let b = match value {
        RawRef::Int(v) => return encode_int(buf, v),
        RawRef::Bytes(b) => b,
    };
    if let Some(v) = parse_canonical_i64(b) {
        return encode_int(buf, v);
    }
    let len = b.len();
    if len < 1 << 6 {
        buf.push(0x80 | len as u8);
    } else if len < 1 << 12 {
        buf.extend_from_slice(&[0xE0 | (len >> 8) as u8, len as u8]);
    } else {
        buf.push(STR_32);
        buf.extend_from_slice(&(len as u32).to_le_bytes());
    }
    buf.extend_from_slice(b);
}

fn encode_int(buf: &mut Vec<u8>, v: i64) {
    if (0..=127).contains(&v) {
        buf.push(v as u8);
    } else if (-4096..=4095).contains(&v) {
        let uval = (if v < 0 { v + (1 << 13) } else { v }) as u16;
        buf.extend_from_slice(&[0xC0 | (uval >> 8) as u8, uval as u8]);
    } else if let Ok(v) = i16::try_from(v) {
        buf.push(INT_16);
        buf.extend_from_slice(&v.to_le_bytes());
    } else if (-(1 << 23)..1 << 23).contains(&v) {
        buf.push(INT_24);
        buf.extend_from_slice(&(v as i32).to_le_bytes()[..3]);
    } else if let Ok(v) = i32::try_from(v) {
        buf.push(INT_32);
        buf.extend_from_slice(&v.to_le_bytes());
    } else {
        buf.push(INT_64);
        buf.extend_from_slice(&v.to_le_bytes());
    }
}

/// Forward walk over a [`Listpack`].
///
/// A structural fault is returned once; the iterator is exhausted after it.
#[derive(Debug, Clone)]
pub struct ListpackIter<'a> {
    buf: &'a [u8],
    pos: usize,
    remaining: usize,
    failed: bool,
}

impl<'a> ListpackIter<'a> {
    /// Offset of the next entry within the blob.
    pub fn offset(&self) -> usize {
        self.pos
    }
}

impl<'a> Iterator for ListpackIter<'a> {
    type Item = Result<RawRef<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.pos + 1 >= self.buf.len() {
            return None;
        }
        match parse_entry(self.buf, self.pos) {
            Ok((value, size)) => {
                self.pos += size;
                self.remaining = self.remaining.saturating_sub(1);
                Some(Ok(value))
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

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_empty_listpack() {
        let buf = [7, 0, 0, 0, 0, 0, 0xFF];
        let lp = Listpack::new(Bytes::copy_from_slice(&buf)).unwrap();
        assert!(lp.is_empty());
        assert!(lp.iter().next().is_none());
        assert_eq!(Listpack::from_entries(Vec::new()).as_bytes()[..], buf);
    }

    #[test]
    fn test_hand_encoded_entries() {
        // 5, "hi", -1 (13-bit)
        let buf = [
            14, 0, 0, 0, 3, 0, // header
            0x05, 0x01, // 7-bit uint
            0x82, b'h', b'i', 0x03, // 6-bit string
            0xDF, 0xFF, 0x02, // 13-bit -1
            0xFF,
        ];
        let buf = {
            let mut v = buf.to_vec();
            v[0] = v.len() as u8;
            v
        };
        let lp = Listpack::new(Bytes::from(buf)).unwrap();
        let items: Vec<_> = lp.iter().map(|e| e.unwrap()).collect();
        assert_eq!(items, vec![RawRef::Int(5), RawRef::Bytes(b"hi"), RawRef::Int(-1)]);
    }

    #[test]
    fn test_offset_through_mut_ref() {
        fn step(entries: &mut ListpackIter<'_>) -> usize {
            entries.next();
            entries.offset()
        }
        let lp = Listpack::from_entries(vec![RawRef::Int(5), RawRef::Bytes(b"hi")]);
        let mut it = lp.iter();
        assert_eq!(it.offset(), 6);
        // 7-bit uint plus its backlen
        assert_eq!(step(&mut it), 8);
        // 6-bit string header, two bytes, backlen
        assert_eq!(step(&mut it), 12);
    }

    #[test]
    fn test_backlen_sizes() {
        assert_eq!(encode_backlen(127).1, 1);
        assert_eq!(encode_backlen(128), ([1, 128, 0, 0, 0], 2));
        assert_eq!(encode_backlen(16383).1, 3);
        assert_eq!(encode_backlen(2097151).1, 4);
        assert_eq!(encode_backlen(268435455).1, 5);
    }

    #[test]
    fn test_string_classes() {
        let mid = "m".repeat(200);
        let big = "b".repeat(5000);
        let entries = ["", "s", mid.as_str(), big.as_str(), "-0"];
        let lp = Listpack::from_entries(entries.iter().map(|s| RawRef::Bytes(s.as_bytes())));
        let lp = Listpack::new(lp.as_bytes().clone()).unwrap();
        let back: Vec<String> = lp.iter().map(|e| e.unwrap().to_string()).collect();
        assert_eq!(back, entries);
    }

    #[test]
    fn test_bad_backlen_rejected() {
        let mut buf = Listpack::from_entries([RawRef::Bytes(b"abc")]).as_bytes().to_vec();
        let backlen_at = buf.len() - 2;
        buf[backlen_at] = 9;
        assert!(matches!(
            Listpack::new(Bytes::from(buf)),
            Err(RdbError::CorruptedPayload { .. })
        ));
    }

    #[test]
    fn test_count_and_total_checked() {
        let good = Listpack::from_entries([RawRef::Int(1), RawRef::Int(2)]);

        let mut buf = good.as_bytes().to_vec();
        buf[4] = 5;
        assert!(matches!(
            Listpack::new(Bytes::from(buf)),
            Err(RdbError::CorruptedPayload { offset: 4, .. })
        ));

        let mut buf = good.as_bytes().to_vec();
        buf[4] = 0xFF;
        buf[5] = 0xFF;
        assert_eq!(Listpack::new(Bytes::from(buf)).unwrap().len(), 2);

        let mut buf = good.as_bytes().to_vec();
        buf.truncate(buf.len() - 1);
        assert!(Listpack::new(Bytes::from(buf)).is_err());
    }

    #[test]
    fn test_string_past_end() {
        // 6-bit string of 10 bytes with only 2 present
        let buf = [10, 0, 0, 0, 1, 0, 0x8A, b'a', b'b', 0xFF];
        assert!(matches!(
            Listpack::new(Bytes::copy_from_slice(&buf)),
            Err(RdbError::CorruptedPayload { .. })
        ));
    }

    #[test]
    fn test_unknown_encoding() {
        let buf = [9, 0, 0, 0, 1, 0, 0xF5, 0x01, 0xFF];
        assert!(matches!(
            Listpack::new(Bytes::copy_from_slice(&buf)),
            Err(RdbError::UnsupportedEncoding { tag: 0xF5, .. })
        ));
    }

    proptest! {
        #[test]
        fn prop_integers_survive_encoding(values in prop::collection::vec(any::<i64>(), 0..40)) {
            let lp = Listpack::from_entries(values.iter().map(|&v| RawRef::Int(v)));
            let lp = Listpack::new(lp.as_bytes().clone()).unwrap();
            let back: Vec<i64> = lp.iter().map(|e| e.unwrap().to_i64().unwrap()).collect();
            prop_assert_eq!(back, values);
        }
    }
}
