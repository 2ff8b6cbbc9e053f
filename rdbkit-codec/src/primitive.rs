//! Fixed-width primitives: type bytes, timestamps and scores.

use crate::error::{RdbError, Result};
use crate::rio::{Rio, RioWriter};
use crate::types::TypeCode;
use std::io::{Read, Write};

/// Length markers of the legacy ASCII double encoding.
const DOUBLE_NAN: u8 = 253;
const DOUBLE_POS_INF: u8 = 254;
const DOUBLE_NEG_INF: u8 = 255;

/// Longest text a finite double can need in exponent form.
const MAX_DOUBLE_TEXT: usize = 24;

impl<R: Read> Rio<R> {
    /// Reads an object type byte.
    pub fn load_type(&mut self) -> Result<TypeCode> {
        TypeCode::try_from(self.read_u8()?)
    }

    /// Reads a 4-byte absolute time in seconds.
    pub fn load_time(&mut self) -> Result<i64> {
        Ok(i32::from_le_bytes(self.read_array()?) as i64)
    }

    /// Reads an 8-byte absolute time in milliseconds.
    pub fn load_time_millis(&mut self) -> Result<i64> {
        Ok(i64::from_le_bytes(self.read_array()?))
    }

    /// Reads a double stored as length-prefixed ASCII.
    pub fn load_double_value(&mut self) -> Result<f64> {
        let offset = self.tell();
        match self.read_u8()? {
            DOUBLE_NAN => Ok(f64::NAN),
            DOUBLE_POS_INF => Ok(f64::INFINITY),
            DOUBLE_NEG_INF => Ok(f64::NEG_INFINITY),
            len => {
                let buf = self.read(len as usize)?;
                std::str::from_utf8(&buf)
                    .ok()
                    .and_then(|s| s.parse::<f64>().ok())
                    .ok_or_else(|| {
                        RdbError::corrupted(
                            offset,
                            format!("invalid double '{}'", String::from_utf8_lossy(&buf)),
                        )
                    })
            }
        }
    }

    /// Reads an 8-byte IEEE 754 double.
    pub fn load_binary_double(&mut self) -> Result<f64> {
        Ok(f64::from_le_bytes(self.read_array()?))
    }

    /// Reads a 4-byte IEEE 754 float.
    pub fn load_binary_float(&mut self) -> Result<f32> {
        Ok(f32::from_le_bytes(self.read_array()?))
    }
}

impl<W: Write> RioWriter<W> {
    pub fn save_type(&mut self, code: TypeCode) -> Result<()> {
        self.write_u8(code.as_u8())
    }

    /// Writes a 4-byte absolute time in seconds.
    pub fn save_time(&mut self, secs: i32) -> Result<()> {
        self.write(&secs.to_le_bytes())
    }

    /// Writes an 8-byte absolute time in milliseconds.
    pub fn save_time_millis(&mut self, millis: i64) -> Result<()> {
        self.write(&millis.to_le_bytes())
    }

    /// Writes a double as length-prefixed ASCII, in the shortest text that
    /// parses back to the same bits.
    pub fn save_double_value(&mut self, v: f64) -> Result<()> {
        if v.is_nan() {
            self.write_u8(DOUBLE_NAN)
        } else if v == f64::INFINITY {
            self.write_u8(DOUBLE_POS_INF)
        } else if v == f64::NEG_INFINITY {
            self.write_u8(DOUBLE_NEG_INF)
        } else {
            let plain = v.to_string();
            let text = if plain.len() <= MAX_DOUBLE_TEXT {
                plain
            } else {
                format!("{v:e}")
            };
            let len = u8::try_from(text.len())
                .ok()
                .filter(|&n| n < DOUBLE_NAN)
                .ok_or_else(|| {
                    RdbError::corrupted(self.tell(), format!("double text '{text}' is too long"))
                })?;
            self.write_u8(len)?;
            self.write(text.as_bytes())
        }
    }

    pub fn save_binary_double(&mut self, v: f64) -> Result<()> {
        self.write(&v.to_le_bytes())
    }

    pub fn save_binary_float(&mut self, v: f32) -> Result<()> {
        self.write(&v.to_le_bytes())
    }
}
