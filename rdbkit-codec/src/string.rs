//! String objects: plain, integer-encoded and LZF-compressed.

use crate::error::{RdbError, Result};
use crate::length::{Length, SpecialEncoding};
use crate::lzf;
use crate::raw::{parse_canonical_i64, RawRef, RawValue};
use crate::rio::{Rio, RioWriter};
use bytes::Bytes;
use std::io::{Read, Write};
use tracing::trace;

/// Longest string that is considered for integer encoding.
const MAX_INT_ENCODING_LEN: usize = 11;

impl<R: Read> Rio<R> {
    /// Reads a string object.
    ///
    /// Integer-encoded strings come back as [`RawValue::Int`] without
    /// allocating their decimal text; compressed strings are inflated.
    pub fn load_string_object(&mut self) -> Result<RawValue> {
        match self.load_length()? {
            Length::Len(len) => {
                let len = usize::try_from(len).map_err(|_| {
                    RdbError::corrupted(self.tell(), format!("string length {len} too large"))
                })?;
                Ok(RawValue::Bytes(self.read(len)?))
            }
            Length::Special(SpecialEncoding::Int8) => {
                Ok(RawValue::Int(i8::from_le_bytes(self.read_array()?) as i64))
            }
            Length::Special(SpecialEncoding::Int16) => {
                Ok(RawValue::Int(i16::from_le_bytes(self.read_array()?) as i64))
            }
            Length::Special(SpecialEncoding::Int32) => {
                Ok(RawValue::Int(i32::from_le_bytes(self.read_array()?) as i64))
            }
            Length::Special(SpecialEncoding::Lzf) => Ok(RawValue::Bytes(self.load_lzf_string()?)),
        }
    }

    /// Reads a string object as bytes, rendering integers as decimal text.
    pub fn load_string_bytes(&mut self) -> Result<Bytes> {
        Ok(self.load_string_object()?.to_bytes())
    }

    /// Reads the body of an LZF-compressed string (after its marker).
    fn load_lzf_string(&mut self) -> Result<Bytes> {
        let compressed_len = self.load_usize()?;
        let len = self.load_usize()?;
        let offset = self.tell();
        trace!(offset, compressed_len, len, "inflating lzf string");
        let compressed = self.read(compressed_len)?;
        let inflated = lzf::decompress_at(&compressed, len, offset)?;
        Ok(Bytes::from(inflated))
    }
}

impl<W: Write> RioWriter<W> {
    /// Writes bytes with a plain length prefix.
    pub fn save_raw_string(&mut self, s: &[u8]) -> Result<()> {
        self.save_length(s.len() as u64)?;
        self.write(s)
    }

    /// Writes a string, integer-encoding it when it is short canonical
    /// decimal text that fits in 32 bits.
    pub fn save_string(&mut self, s: &[u8]) -> Result<()> {
        if s.len() <= MAX_INT_ENCODING_LEN {
            if let Some(v) = parse_canonical_i64(s) {
                if self.try_save_int_encoded(v)? {
                    return Ok(());
                }
            }
        }
        self.save_raw_string(s)
    }

    /// Writes an integer, falling back to its decimal text when it does not
    /// fit the 32-bit special encoding.
    pub fn save_int_string(&mut self, v: i64) -> Result<()> {
        if !self.try_save_int_encoded(v)? {
            self.save_raw_string(v.to_string().as_bytes())?;
        }
        Ok(())
    }

    /// Writes a scalar in its most compact string form.
    pub fn save_raw_value(&mut self, value: RawRef<'_>) -> Result<()> {
        match value {
            RawRef::Bytes(b) => self.save_string(b),
            RawRef::Int(v) => self.save_int_string(v),
        }
    }

    fn try_save_int_encoded(&mut self, v: i64) -> Result<bool> {
        if let Ok(v) = i8::try_from(v) {
            self.save_special(SpecialEncoding::Int8)?;
            self.write(&v.to_le_bytes())?;
        } else if let Ok(v) = i16::try_from(v) {
            self.save_special(SpecialEncoding::Int16)?;
            self.write(&v.to_le_bytes())?;
        } else if let Ok(v) = i32::try_from(v) {
            self.save_special(SpecialEncoding::Int32)?;
            self.write(&v.to_le_bytes())?;
        } else {
            return Ok(false);
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(bytes: &[u8]) -> Result<RawValue> {
        Rio::new(bytes).load_string_object()
    }

    fn save(f: impl FnOnce(&mut RioWriter<Vec<u8>>) -> Result<()>) -> Vec<u8> {
        let mut w = RioWriter::new(Vec::new());
        f(&mut w).unwrap();
        w.into_inner()
    }

    #[test]
    fn test_plain_string() {
        let value = load(b"\x03foo").unwrap();
        assert_eq!(value, RawValue::from("foo"));
    }

    #[test]
    fn test_integer_encodings() {
        assert_eq!(load(&[0xC0, 0xFE]).unwrap(), RawValue::Int(-2));
        assert_eq!(load(&[0xC1, 0x39, 0x30]).unwrap(), RawValue::Int(12345));
        assert_eq!(
            load(&[0xC2, 0x00, 0x00, 0x00, 0x80]).unwrap(),
            RawValue::Int(i32::MIN as i64)
        );
    }

    #[test]
    fn test_lzf_string() {
        // marker, compressed length 5, original length 20
        let bytes = [0xC3, 0x05, 0x14, 0x00, b'a', 0xE0, 0x0A, 0x00];
        let value = load(&bytes).unwrap();
        assert_eq!(value, RawValue::Bytes(Bytes::from(vec![b'a'; 20])));
    }

    #[test]
    fn test_lzf_length_mismatch() {
        let bytes = [0xC3, 0x05, 0x15, 0x00, b'a', 0xE0, 0x0A, 0x00];
        assert!(matches!(
            load(&bytes),
            Err(RdbError::CorruptedPayload { .. })
        ));
    }

    #[test]
    fn test_truncated_string() {
        assert!(matches!(
            load(b"\x05ab"),
            Err(RdbError::UnexpectedEof { .. })
        ));
        assert!(matches!(load(&[0xC1, 0x01]), Err(RdbError::UnexpectedEof { .. })));
    }

    #[test]
    fn test_save_string_uses_int_encoding() {
        assert_eq!(save(|w| w.save_string(b"12")), vec![0xC0, 12]);
        assert_eq!(save(|w| w.save_string(b"12345")), vec![0xC1, 0x39, 0x30]);
        assert_eq!(save(|w| w.save_string(b"012")), b"\x03012".to_vec());
        assert_eq!(
            save(|w| w.save_string(b"99999999999")),
            b"\x0b99999999999".to_vec()
        );
    }

    #[test]
    fn test_save_large_int_falls_back_to_text() {
        let bytes = save(|w| w.save_int_string(1 << 40));
        let value = load(&bytes).unwrap();
        assert_eq!(value, RawValue::from("1099511627776"));
    }

    #[test]
    fn test_save_raw_value_roundtrip() {
        for value in [RawValue::from("hello"), RawValue::Int(-7), RawValue::from("")] {
            let bytes = save(|w| w.save_raw_value(value.as_raw()));
            let back = load(&bytes).unwrap();
            assert_eq!(back.to_bytes(), value.to_bytes());
        }
    }
}
