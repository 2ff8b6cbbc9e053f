//! # rdbkit-codec
//!
//! Wire-level primitives of the Redis RDB format.
//!
//! This crate provides:
//! - Checksummed read/write streams with offset tracking
//! - Length prefixes and their special encodings
//! - String objects (plain, integer-encoded, LZF-compressed)
//! - Timestamps and score encodings
//! - The type code and opcode tables
//! - The shared error type

pub mod crc64;
pub mod error;
pub mod length;
pub mod lzf;
pub mod primitive;
pub mod raw;
pub mod rio;
pub mod string;
pub mod types;

pub use crc64::crc64;
pub use error::{ErrorKind, RdbError, Result};
pub use length::{encoded_length_size, Length, SpecialEncoding};
pub use raw::{parse_canonical_i64, RawRef, RawValue};
pub use rio::{Rio, RioWriter};
pub use types::{Opcode, TypeCode};

/// Newest RDB version this implementation reads and writes.
pub const RDB_VERSION: u16 = 11;

/// Magic prefix of an RDB file.
pub const RDB_MAGIC: &[u8; 5] = b"REDIS";
