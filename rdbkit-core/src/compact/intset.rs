//! Intset: a sorted array of fixed-width integers.
//!
//! ```text
//! +-----------+-----------+----------------------------+
//! | width u32 | count u32 | count * width bytes (LE)   |
//! +-----------+-----------+----------------------------+
//! ```

use super::header_u32;
use bytes::Bytes;
use rdbkit_codec::{RdbError, Result};
use std::fmt;

const HEADER_SIZE: usize = 8;

/// A validated intset blob.
#[derive(Clone, PartialEq, Eq)]
pub struct Intset {
    buf: Bytes,
    width: usize,
    len: usize,
}

impl Intset {
    /// Validates `buf` as an intset.
    ///
    /// Widths other than 2, 4 and 8 are `UnsupportedEncoding`; a size that
    /// disagrees with the header or elements out of order are
    /// `CorruptedPayload`.
    pub fn new(buf: Bytes) -> Result<Self> {
        if buf.len() < HEADER_SIZE {
            return Err(RdbError::corrupted(
                0,
                format!("intset of {} bytes is shorter than its header", buf.len()),
            ));
        }
        let width = header_u32(&buf, 0) as usize;
        if !matches!(width, 2 | 4 | 8) {
            return Err(RdbError::UnsupportedEncoding {
                context: "intset",
                tag: width as u64,
            });
        }
        let len = header_u32(&buf, 4) as usize;
        let expected = len
            .checked_mul(width)
            .and_then(|n| n.checked_add(HEADER_SIZE));
        if expected != Some(buf.len()) {
            return Err(RdbError::corrupted(
                4,
                format!(
                    "intset declares {len} elements of {width} bytes but holds {} bytes",
                    buf.len() - HEADER_SIZE
                ),
            ));
        }

        let set = Self { buf, width, len };
        let mut prev = None;
        for (i, v) in set.iter().enumerate() {
            if prev.is_some_and(|p| p >= v) {
                return Err(RdbError::corrupted(
                    (HEADER_SIZE + i * width) as u64,
                    "intset elements are not strictly increasing",
                ));
            }
            prev = Some(v);
        }
        Ok(set)
    }

    /// Builds an intset holding `values`, sorted and deduplicated, using the
    /// narrowest width that fits all of them.
    pub fn from_values(values: impl IntoIterator<Item = i64>) -> Self {
        let mut values: Vec<i64> = values.into_iter().collect();
        values.sort_unstable();
        values.dedup();

        let width = if values
            .iter()
            .all(|&v| i16::try_from(v).is_ok())
        {
            2
        } else if values.iter().all(|&v| i32::try_from(v).is_ok()) {
            4
        } else {
            8
        };

        let mut buf = Vec::with_capacity(HEADER_SIZE + values.len() * width);
        buf.extend_from_slice(&(width as u32).to_le_bytes());
        buf.extend_from_slice(&(values.len() as u32).to_le_bytes());
        for &v in &values {
            buf.extend_from_slice(&v.to_le_bytes()[..width]);
        }
        Self {
            buf: Bytes::from(buf),
            width,
            len: values.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Element width in bytes.
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn get(&self, index: usize) -> Option<i64> {
        (index < self.len).then(|| self.value_at(index))
    }

    pub fn contains(&self, value: i64) -> bool {
        let (mut lo, mut hi) = (0, self.len);
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            match self.value_at(mid).cmp(&value) {
                std::cmp::Ordering::Less => lo = mid + 1,
                std::cmp::Ordering::Greater => hi = mid,
                std::cmp::Ordering::Equal => return true,
            }
        }
        false
    }

    pub fn iter(&self) -> IntsetIter<'_> {
        IntsetIter {
            set: self,
            index: 0,
        }
    }

    /// The encoded blob.
    pub fn as_bytes(&self) -> &Bytes {
        &self.buf
    }

    fn value_at(&self, index: usize) -> i64 {
        let at = HEADER_SIZE + index * self.width;
        let b = &self.buf[at..at + self.width];
        match self.width {
            2 => i16::from_le_bytes([b[0], b[1]]) as i64,
            4 => i32::from_le_bytes([b[0], b[1], b[2], b[3]]) as i64,
            _ => i64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]),
        }
    }
}

impl fmt::Debug for Intset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// Stride walk over an [`Intset`].
#[derive(Debug, Clone)]
pub struct IntsetIter<'a> {
    set: &'a Intset,
    index: usize,
}

impl Iterator for IntsetIter<'_> {
    type Item = i64;

    fn next(&mut self) -> Option<i64> {
        let v = self.set.get(self.index)?;
        self.index += 1;
        Some(v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.set.len - self.index;
        (n, Some(n))
    }
}

impl ExactSizeIterator for IntsetIter<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn blob(width: u32, values: &[i64]) -> Bytes {
        let mut buf = Vec::new();
        buf.extend_from_slice(&width.to_le_bytes());
        buf.extend_from_slice(&(values.len() as u32).to_le_bytes());
        for v in values {
            buf.extend_from_slice(&v.to_le_bytes()[..width as usize]);
        }
        Bytes::from(buf)
    }

    #[test]
    fn test_decode_widths() {
        let set = Intset::new(blob(2, &[-3, 1, 700])).unwrap();
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![-3, 1, 700]);

        let set = Intset::new(blob(8, &[i64::MIN, 0, i64::MAX])).unwrap();
        assert_eq!(set.len(), 3);
        assert_eq!(set.get(2), Some(i64::MAX));
        assert_eq!(set.get(3), None);
    }

    #[test]
    fn test_unsupported_width() {
        assert!(matches!(
            Intset::new(blob(3, &[1])),
            Err(RdbError::UnsupportedEncoding { tag: 3, .. })
        ));
        assert!(matches!(
            Intset::new(blob(16, &[])),
            Err(RdbError::UnsupportedEncoding { tag: 16, .. })
        ));
    }

    #[test]
    fn test_size_mismatch() {
        let mut buf = blob(4, &[1, 2]).to_vec();
        buf.pop();
        assert!(matches!(
            Intset::new(Bytes::from(buf)),
            Err(RdbError::CorruptedPayload { .. })
        ));

        let mut buf = blob(2, &[1]).to_vec();
        buf[4] = 0xFF;
        buf[7] = 0xFF;
        assert!(Intset::new(Bytes::from(buf)).is_err());
    }

    #[test]
    fn test_unsorted_rejected() {
        assert!(matches!(
            Intset::new(blob(2, &[5, 5])),
            Err(RdbError::CorruptedPayload { offset: 10, .. })
        ));
        assert!(Intset::new(blob(4, &[9, 2])).is_err());
    }

    #[test]
    fn test_from_values_picks_width() {
        let set = Intset::from_values([3, 1, 2, 1]);
        assert_eq!(set.width(), 2);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![1, 2, 3]);

        let set = Intset::from_values([70_000, -1]);
        assert_eq!(set.width(), 4);

        let set = Intset::from_values([1 << 40]);
        assert_eq!(set.width(), 8);
        assert!(set.contains(1 << 40));
        assert!(!set.contains(0));

        let again = Intset::new(set.as_bytes().clone()).unwrap();
        assert_eq!(again, set);
    }

    #[test]
    fn test_empty() {
        let set = Intset::new(blob(2, &[])).unwrap();
        assert!(set.is_empty());
        assert_eq!(set.iter().count(), 0);
    }
}
