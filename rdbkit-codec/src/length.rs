//! Length prefixes.
//!
//! ```text
//! 00pppppp                      6-bit length
//! 01pppppp qqqqqqqq             14-bit length, big-endian
//! 10000000 [4 bytes]            32-bit length, big-endian
//! 10000001 [8 bytes]            64-bit length, big-endian
//! 11eeeeee                      special encoding, see SpecialEncoding
//! ```

use crate::error::{RdbError, Result};
use crate::rio::{Rio, RioWriter};
use std::io::{Read, Write};

pub const RDB_6BITLEN: u8 = 0;
pub const RDB_14BITLEN: u8 = 1;
pub const RDB_32BITLEN: u8 = 0x80;
pub const RDB_64BITLEN: u8 = 0x81;
pub const RDB_ENCVAL: u8 = 3;

/// Special encodings selected by the `11` prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SpecialEncoding {
    /// 8-bit signed integer follows.
    Int8 = 0,
    /// 16-bit signed integer follows, little-endian.
    Int16 = 1,
    /// 32-bit signed integer follows, little-endian.
    Int32 = 2,
    /// LZF-compressed string follows.
    Lzf = 3,
}

/// A decoded length prefix: either a count or a special-encoding marker,
/// never both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Length {
    Len(u64),
    Special(SpecialEncoding),
}

/// Returns how many bytes `save_length` emits for `len`.
pub fn encoded_length_size(len: u64) -> usize {
    if len < 1 << 6 {
        1
    } else if len < 1 << 14 {
        2
    } else if len <= u32::MAX as u64 {
        5
    } else {
        9
    }
}

impl<R: Read> Rio<R> {
    /// Reads a length prefix.
    pub fn load_length(&mut self) -> Result<Length> {
        let first = self.read_u8()?;
        match (first & 0xC0) >> 6 {
            RDB_6BITLEN => Ok(Length::Len((first & 0x3F) as u64)),
            RDB_14BITLEN => {
                let second = self.read_u8()?;
                Ok(Length::Len((((first & 0x3F) as u64) << 8) | second as u64))
            }
            RDB_ENCVAL => match first & 0x3F {
                0 => Ok(Length::Special(SpecialEncoding::Int8)),
                1 => Ok(Length::Special(SpecialEncoding::Int16)),
                2 => Ok(Length::Special(SpecialEncoding::Int32)),
                3 => Ok(Length::Special(SpecialEncoding::Lzf)),
                tag => Err(RdbError::UnsupportedEncoding {
                    context: "string",
                    tag: tag as u64,
                }),
            },
            _ => match first {
                RDB_32BITLEN => Ok(Length::Len(u32::from_be_bytes(self.read_array()?) as u64)),
                RDB_64BITLEN => Ok(Length::Len(u64::from_be_bytes(self.read_array()?))),
                other => Err(RdbError::UnsupportedEncoding {
                    context: "length",
                    tag: other as u64,
                }),
            },
        }
    }

    /// Reads a length prefix that must be a plain count.
    pub fn load_len(&mut self) -> Result<u64> {
        let offset = self.tell();
        match self.load_length()? {
            Length::Len(len) => Ok(len),
            Length::Special(enc) => Err(RdbError::corrupted(
                offset,
                format!("expected a length, found special encoding {enc:?}"),
            )),
        }
    }

    /// Reads a plain count that must fit in memory addressing.
    pub fn load_usize(&mut self) -> Result<usize> {
        let offset = self.tell();
        let len = self.load_len()?;
        usize::try_from(len)
            .map_err(|_| RdbError::corrupted(offset, format!("length {len} exceeds address space")))
    }
}

impl<W: Write> RioWriter<W> {
    /// Writes `len` using the smallest size class that holds it.
    pub fn save_length(&mut self, len: u64) -> Result<usize> {
        if len < 1 << 6 {
            self.write_u8((RDB_6BITLEN << 6) | len as u8)?;
            Ok(1)
        } else if len < 1 << 14 {
            self.write(&[(RDB_14BITLEN << 6) | (len >> 8) as u8, len as u8])?;
            Ok(2)
        } else if len <= u32::MAX as u64 {
            self.write_u8(RDB_32BITLEN)?;
            self.write(&(len as u32).to_be_bytes())?;
            Ok(5)
        } else {
            self.write_u8(RDB_64BITLEN)?;
            self.write(&len.to_be_bytes())?;
            Ok(9)
        }
    }

    /// Writes a special-encoding marker.
    pub fn save_special(&mut self, enc: SpecialEncoding) -> Result<()> {
        self.write_u8((RDB_ENCVAL << 6) | enc as u8)
    }
}
