//! DUMP payload codec.
//!
//! A payload is one serialized object plus a footer:
//!
//! ```text
//! +----------+--------------+----------------+-----------------+
//! | type: u8 | body         | version: u16LE | crc64: u64LE    |
//! +----------+--------------+----------------+-----------------+
//!  \______________ checksummed ______________/
//! ```
//!
//! The checksum is verified before the version so that a damaged footer
//! reports corruption rather than a version it never carried.

use crate::object::{decode_object, save_object};
use crate::options::DecodeOptions;
use crate::value::Value;
use rdbkit_codec::{crc64, RdbError, Result, Rio, RioWriter, RDB_VERSION};
use tracing::trace;

const VERSION_SIZE: usize = 2;
const CHECKSUM_SIZE: usize = 8;
const FOOTER_SIZE: usize = VERSION_SIZE + CHECKSUM_SIZE;

/// Serializes `value` as a DUMP payload stamped with [`RDB_VERSION`].
pub fn create_dump_payload(value: &Value) -> Result<Vec<u8>> {
    let mut w = RioWriter::new(Vec::new());
    w.save_type(value.type_code())?;
    save_object(&mut w, value)?;
    w.write(&RDB_VERSION.to_le_bytes())?;
    let checksum = w.checksum();
    w.write(&checksum.to_le_bytes())?;
    let payload = w.into_inner();
    trace!(
        type_code = %value.type_code(),
        bytes = payload.len(),
        "created dump payload"
    );
    Ok(payload)
}

/// Decodes a DUMP payload with default options.
pub fn decode_from_payload(payload: &[u8]) -> Result<Value> {
    decode_from_payload_with(payload, &DecodeOptions::default())
}

/// Decodes a DUMP payload.
///
/// Fails with `CorruptedPayload` when the footer is missing, the checksum
/// does not match or bytes remain after the object, and with
/// `UnsupportedVersion` when the payload is newer than
/// [`DecodeOptions::max_version`].
pub fn decode_from_payload_with(payload: &[u8], opts: &DecodeOptions) -> Result<Value> {
    if payload.len() < FOOTER_SIZE {
        return Err(RdbError::corrupted(
            0,
            format!(
                "payload of {} bytes is shorter than its {FOOTER_SIZE}-byte footer",
                payload.len()
            ),
        ));
    }
    let (checked, footer) = payload.split_at(payload.len() - CHECKSUM_SIZE);
    let body_len = checked.len() - VERSION_SIZE;

    if opts.verify_checksum {
        let mut expected = [0u8; CHECKSUM_SIZE];
        expected.copy_from_slice(footer);
        let expected = u64::from_le_bytes(expected);
        let actual = crc64(0, checked);
        if expected != actual {
            return Err(RdbError::ChecksumMismatch { expected, actual });
        }
    }

    let version = u16::from_le_bytes([checked[body_len], checked[body_len + 1]]);
    if version > opts.max_version {
        return Err(RdbError::UnsupportedVersion {
            version,
            max: opts.max_version,
        });
    }

    let body = &checked[..body_len];
    let mut rio = Rio::new(body);
    let value = decode_object(&mut rio, opts)?;
    let consumed = rio.tell();
    if consumed != body_len as u64 {
        return Err(RdbError::corrupted(
            consumed,
            format!("{} trailing bytes after object", body_len as u64 - consumed),
        ));
    }
    Ok(value)
}
