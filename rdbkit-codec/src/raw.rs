//! Scalar string values.
//!
//! RDB stores short numeric strings as integers. A decoded scalar is
//! therefore either a byte string or an `i64`, and rendering the integer
//! case must reproduce its decimal text.

use bytes::Bytes;
use std::borrow::Cow;
use std::fmt;

/// An owned scalar: bytes, or an integer standing in for its decimal text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RawValue {
    Bytes(Bytes),
    Int(i64),
}

/// A borrowed scalar.
///
/// The `Bytes` case points into the buffer of the value it was obtained
/// from and cannot outlive it. Use [`RawRef::into_owned`] or
/// [`RawRef::to_vec`] to keep the contents beyond that borrow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RawRef<'a> {
    Bytes(&'a [u8]),
    Int(i64),
}

impl RawValue {
    /// Borrows this value.
    pub fn as_raw(&self) -> RawRef<'_> {
        match self {
            RawValue::Bytes(b) => RawRef::Bytes(b),
            RawValue::Int(v) => RawRef::Int(*v),
        }
    }

    /// Length of the textual form.
    pub fn len(&self) -> usize {
        self.as_raw().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the textual form as shared bytes.
    pub fn to_bytes(&self) -> Bytes {
        match self {
            RawValue::Bytes(b) => b.clone(),
            RawValue::Int(v) => Bytes::from(v.to_string()),
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            RawValue::Int(v) => Some(*v),
            RawValue::Bytes(_) => None,
        }
    }
}

impl<'a> RawRef<'a> {
    /// Length of the textual form.
    pub fn len(&self) -> usize {
        match self {
            RawRef::Bytes(b) => b.len(),
            RawRef::Int(v) => decimal_len(*v),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Borrowing text view. Only the integer case allocates.
    pub fn as_bytes(&self) -> Cow<'a, [u8]> {
        match *self {
            RawRef::Bytes(b) => Cow::Borrowed(b),
            RawRef::Int(v) => Cow::Owned(v.to_string().into_bytes()),
        }
    }

    /// Copying text view.
    pub fn to_vec(&self) -> Vec<u8> {
        self.as_bytes().into_owned()
    }

    /// Copies the textual form into shared bytes.
    pub fn to_bytes(&self) -> Bytes {
        Bytes::from(self.to_vec())
    }

    /// Detaches this scalar from the buffer it borrows.
    pub fn into_owned(self) -> RawValue {
        match self {
            RawRef::Bytes(b) => RawValue::Bytes(Bytes::copy_from_slice(b)),
            RawRef::Int(v) => RawValue::Int(v),
        }
    }

    /// Interprets the scalar as an integer; byte strings must be canonical
    /// decimal text.
    pub fn to_i64(&self) -> Option<i64> {
        match *self {
            RawRef::Int(v) => Some(v),
            RawRef::Bytes(b) => parse_canonical_i64(b),
        }
    }

    /// Interprets the scalar as a floating point number.
    pub fn to_f64(&self) -> Option<f64> {
        match *self {
            RawRef::Int(v) => Some(v as f64),
            RawRef::Bytes(b) => std::str::from_utf8(b).ok()?.parse().ok(),
        }
    }
}

impl PartialEq<[u8]> for RawRef<'_> {
    fn eq(&self, other: &[u8]) -> bool {
        self.as_bytes().as_ref() == other
    }
}

impl PartialEq<str> for RawRef<'_> {
    fn eq(&self, other: &str) -> bool {
        self.as_bytes().as_ref() == other.as_bytes()
    }
}

impl fmt::Display for RawRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawRef::Bytes(b) => write!(f, "{}", String::from_utf8_lossy(b)),
            RawRef::Int(v) => write!(f, "{v}"),
        }
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_raw().fmt(f)
    }
}

impl From<Bytes> for RawValue {
    fn from(b: Bytes) -> Self {
        RawValue::Bytes(b)
    }
}

impl From<Vec<u8>> for RawValue {
    fn from(v: Vec<u8>) -> Self {
        RawValue::Bytes(Bytes::from(v))
    }
}

impl From<&[u8]> for RawValue {
    fn from(b: &[u8]) -> Self {
        RawValue::Bytes(Bytes::copy_from_slice(b))
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Bytes(Bytes::copy_from_slice(s.as_bytes()))
    }
}

impl From<i64> for RawValue {
    fn from(v: i64) -> Self {
        RawValue::Int(v)
    }
}

/// Parses `b` as an integer only if formatting it back yields `b` exactly
/// (no sign on zero, no leading zeros, no whitespace).
pub fn parse_canonical_i64(b: &[u8]) -> Option<i64> {
    if b.is_empty() || b.len() > 20 {
        return None;
    }
    let v: i64 = std::str::from_utf8(b).ok()?.parse().ok()?;
    let mut buf = [0u8; 20];
    let text = format_i64(v, &mut buf);
    (text == b).then_some(v)
}

/// Formats `v` into `buf` without allocating, returning the used tail.
fn format_i64(v: i64, buf: &mut [u8; 20]) -> &[u8] {
    let mut n = v.unsigned_abs();
    let mut pos = buf.len();
    loop {
        pos -= 1;
        buf[pos] = b'0' + (n % 10) as u8;
        n /= 10;
        if n == 0 {
            break;
        }
    }
    if v < 0 {
        pos -= 1;
        buf[pos] = b'-';
    }
    &buf[pos..]
}

fn decimal_len(v: i64) -> usize {
    let mut n = v.unsigned_abs();
    let mut len = if v < 0 { 2 } else { 1 };
    while n >= 10 {
        n /= 10;
        len += 1;
    }
    len
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_views_agree() {
        let value = RawValue::Int(12345);
        let raw = value.as_raw();
        assert_eq!(raw.to_vec(), b"12345".to_vec());
        assert_eq!(raw.as_bytes().as_ref(), b"12345");
        assert_eq!(raw.to_string(), "12345");
        assert_eq!(value.to_bytes(), Bytes::from_static(b"12345"));
        assert_eq!(raw.len(), 5);
    }

    #[test]
    fn test_bytes_view_borrows() {
        let value = RawValue::from("foo");
        match value.as_raw().as_bytes() {
            Cow::Borrowed(b) => assert_eq!(b, b"foo"),
            Cow::Owned(_) => panic!("byte strings must not be copied"),
        }
        assert!(value.as_raw() == *"foo");
    }

    #[test]
    fn test_decimal_len() {
        assert_eq!(RawRef::Int(0).len(), 1);
        assert_eq!(RawRef::Int(-1).len(), 2);
        assert_eq!(RawRef::Int(9).len(), 1);
        assert_eq!(RawRef::Int(10).len(), 2);
        assert_eq!(RawRef::Int(i64::MIN).len(), 20);
        assert_eq!(RawRef::Int(i64::MAX).len(), 19);
    }

    #[test]
    fn test_canonical_integers() {
        assert_eq!(parse_canonical_i64(b"123"), Some(123));
        assert_eq!(parse_canonical_i64(b"-42"), Some(-42));
        assert_eq!(parse_canonical_i64(b"0"), Some(0));
        assert_eq!(
            parse_canonical_i64(b"-9223372036854775808"),
            Some(i64::MIN)
        );
        assert_eq!(parse_canonical_i64(b"007"), None);
        assert_eq!(parse_canonical_i64(b"-0"), None);
        assert_eq!(parse_canonical_i64(b"+5"), None);
        assert_eq!(parse_canonical_i64(b" 5"), None);
        assert_eq!(parse_canonical_i64(b""), None);
        assert_eq!(parse_canonical_i64(b"9223372036854775808"), None);
    }

    #[test]
    fn test_numeric_conversions() {
        assert_eq!(RawRef::Bytes(b"17").to_i64(), Some(17));
        assert_eq!(RawRef::Bytes(b"1.5").to_f64(), Some(1.5));
        assert_eq!(RawRef::Int(3).to_f64(), Some(3.0));
        assert_eq!(RawRef::Bytes(b"abc").to_f64(), None);
    }

    #[test]
    fn test_into_owned_detaches() {
        let owned = {
            let buf = b"detached".to_vec();
            RawRef::Bytes(&buf).into_owned()
        };
        assert_eq!(owned.to_string(), "detached");
    }
}
