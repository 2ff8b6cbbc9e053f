//! Zipmap: the legacy packed hash.
//!
//! ```text
//! <zmlen> <len>key <len><free>value[free bytes] ... 0xFF
//! ```
//!
//! Lengths are one byte below 254, otherwise 254 followed by a `u32` LE.
//! `zmlen` saturates at 254, meaning the pair count must be walked.

use super::Cursor;
use bytes::Bytes;
use rdbkit_codec::{RawRef, RdbError, Result};
use std::collections::HashSet;
use std::fmt;

const BIG_LEN: u8 = 254;
const END: u8 = 255;

/// A validated zipmap blob.
#[derive(Clone, PartialEq, Eq)]
pub struct Zipmap {
    buf: Bytes,
    len: usize,
}

impl Zipmap {
    /// Validates `buf` as a zipmap. Keys must be unique and the blob must end
    /// exactly at its terminator.
    pub fn new(buf: Bytes) -> Result<Self> {
        if buf.is_empty() {
            return Err(RdbError::corrupted(0, "empty zipmap"));
        }
        let zmlen = buf[0];

        let mut pos = 1;
        let mut keys = HashSet::new();
        while let Some((key, _, next)) = parse_pair(&buf, pos)? {
            if !keys.insert(key) {
                return Err(RdbError::corrupted(pos as u64, "duplicate zipmap key"));
            }
            pos = next;
        }
        let count = keys.len();
        drop(keys);
        if pos + 1 != buf.len() {
            return Err(RdbError::corrupted(
                (pos + 1) as u64,
                "trailing bytes after zipmap terminator",
            ));
        }
        if zmlen < BIG_LEN && zmlen as usize != count {
            return Err(RdbError::corrupted(
                0,
                format!("zipmap declares {zmlen} pairs, found {count}"),
            ));
        }
        Ok(Self { buf, len: count })
    }

    /// Encodes `pairs` as a zipmap. Callers pass unique keys.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a [u8], &'a [u8])>) -> Self {
        let mut buf = vec![0u8];
        let mut count = 0usize;
        for (key, value) in pairs {
            encode_len(&mut buf, key.len());
            buf.extend_from_slice(key);
            encode_len(&mut buf, value.len());
            buf.push(0);
            buf.extend_from_slice(value);
            count += 1;
        }
        buf.push(END);
        buf[0] = count.min(BIG_LEN as usize) as u8;
        Self {
            buf: Bytes::from(buf),
            len: count,
        }
    }

    /// Number of key/value pairs.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn iter(&self) -> ZipmapIter<'_> {
        ZipmapIter {
            buf: &self.buf,
            pos: 1,
            done: false,
        }
    }

    /// The encoded blob.
    pub fn as_bytes(&self) -> &Bytes {
        &self.buf
    }
}

impl fmt::Debug for Zipmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Zipmap")
            .field("len", &self.len)
            .field("bytes", &self.buf.len())
            .finish()
    }
}

fn encode_len(buf: &mut Vec<u8>, len: usize) {
    if len < BIG_LEN as usize {
        buf.push(len as u8);
    } else {
        buf.push(BIG_LEN);
        buf.extend_from_slice(&(len as u32).to_le_bytes());
    }
}

fn decode_len(first: u8, cur: &mut Cursor<'_>) -> Result<usize> {
    match first {
        BIG_LEN => Ok(u32::from_le_bytes(cur.array()?) as usize),
        END => Err(RdbError::corrupted(
            cur.pos() as u64 - 1,
            "zipmap value length is the end marker",
        )),
        n => Ok(n as usize),
    }
}

/// Decodes the pair at `pos`; `None` at the terminator.
fn parse_pair(buf: &[u8], pos: usize) -> Result<Option<(&[u8], &[u8], usize)>> {
    let mut cur = Cursor::new(buf, pos, buf.len(), "zipmap");
    let first = cur.u8()?;
    if first == END {
        return Ok(None);
    }
    let key_len = decode_len(first, &mut cur)?;
    let key = cur.take(key_len)?;

    let first = cur.u8()?;
    let value_len = decode_len(first, &mut cur)?;
    let free = cur.u8()? as usize;
    let value = cur.take(value_len)?;
    cur.take(free)?;
    Ok(Some((key, value, cur.pos())))
}

/// Pairwise walk over a [`Zipmap`].
#[derive(Debug, Clone)]
pub struct ZipmapIter<'a> {
    buf: &'a [u8],
    pos: usize,
    done: bool,
}

impl<'a> Iterator for ZipmapIter<'a> {
    type Item = Result<(RawRef<'a>, RawRef<'a>)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match parse_pair(self.buf, self.pos) {
            Ok(Some((key, value, next))) => {
                self.pos = next;
                Some(Ok((RawRef::Bytes(key), RawRef::Bytes(value))))
            }
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(zm: &Zipmap) -> Vec<(String, String)> {
        zm.iter()
            .map(|p| {
                let (k, v) = p.unwrap();
                (k.to_string(), v.to_string())
            })
            .collect()
    }

    #[test]
    fn test_hand_encoded_zipmap() {
        // {"a": "xy"} with two free bytes of padding
        let buf = [1, 1, b'a', 2, 2, b'x', b'y', 0, 0, 0xFF];
        let zm = Zipmap::new(Bytes::copy_from_slice(&buf)).unwrap();
        assert_eq!(zm.len(), 1);
        assert_eq!(pairs(&zm), vec![("a".to_string(), "xy".to_string())]);
    }

    #[test]
    fn test_empty_zipmap() {
        let zm = Zipmap::new(Bytes::from_static(&[0, 0xFF])).unwrap();
        assert!(zm.is_empty());
        assert!(zm.iter().next().is_none());
    }

    #[test]
    fn test_big_lengths() {
        let value = vec![b'v'; 300];
        let zm = Zipmap::from_pairs([(&b"k"[..], &value[..]), (&b"e"[..], &b""[..])]);
        let zm = Zipmap::new(zm.as_bytes().clone()).unwrap();
        let got = pairs(&zm);
        assert_eq!(got[0].1.len(), 300);
        assert_eq!(got[1], ("e".to_string(), String::new()));
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let zm = Zipmap::from_pairs([(&b"k"[..], &b"1"[..]), (&b"k"[..], &b"2"[..])]);
        assert!(matches!(
            Zipmap::new(zm.as_bytes().clone()),
            Err(RdbError::CorruptedPayload { .. })
        ));
    }

    #[test]
    fn test_missing_terminator_and_trailing_bytes() {
        assert!(Zipmap::new(Bytes::from_static(&[1, 1, b'a', 1, 0, b'b'])).is_err());
        assert!(matches!(
            Zipmap::new(Bytes::from_static(&[0, 0xFF, 0x00])),
            Err(RdbError::CorruptedPayload { .. })
        ));
    }

    #[test]
    fn test_count_mismatch() {
        assert!(matches!(
            Zipmap::new(Bytes::from_static(&[2, 1, b'a', 1, 0, b'b', 0xFF])),
            Err(RdbError::CorruptedPayload { offset: 0, .. })
        ));
        // 254 means the count is unknown
        let zm = Zipmap::new(Bytes::from_static(&[254, 1, b'a', 1, 0, b'b', 0xFF])).unwrap();
        assert_eq!(zm.len(), 1);
    }

    #[test]
    fn test_free_bytes_past_end() {
        assert!(Zipmap::new(Bytes::from_static(&[1, 1, b'a', 1, 9, b'b', 0xFF])).is_err());
    }
}
