//! # rdbkit
//!
//! Decoder and DUMP payload codec for the Redis RDB format.
//!
//! ```text
//! bytes ─► Rio ─► length/string codec ─► object dispatch ─► Value
//!                                         │                   │
//!                  packed blobs ◄─────────┘          iterators, views
//! ```
//!
//! The entry points decode one object from a byte source, decode or create
//! a DUMP payload, or walk a whole RDB file with [`Loader`].

pub mod config;

pub use config::{Config, ConfigError, DecodeConfig};
pub use rdbkit_codec::{ErrorKind, RawRef, RawValue, RdbError, Result, Rio, TypeCode, RDB_VERSION};
pub use rdbkit_core::{
    DecodeOptions, Encoding, HashValue, ListValue, ModuleValue, SetValue, SharedValue, StreamId,
    StreamValue, Value, ZSetValue,
};
pub use rdbkit_loader::{KeyEntry, Loader, RdbWriter, Record};

use std::io::Read;

/// Decodes one type-tagged object from `reader` with default options.
pub fn decode<R: Read>(reader: R) -> Result<Value> {
    decode_with(reader, &DecodeOptions::default())
}

/// Decodes one type-tagged object from `reader`.
pub fn decode_with<R: Read>(reader: R, opts: &DecodeOptions) -> Result<Value> {
    let mut rio = Rio::new(reader);
    rdbkit_core::decode_object(&mut rio, opts)
}

/// Decodes a DUMP payload.
pub fn decode_payload(payload: &[u8]) -> Result<Value> {
    rdbkit_core::decode_from_payload(payload)
}

/// Decodes a DUMP payload with options, typically from [`Config::decode_options`].
pub fn decode_payload_with(payload: &[u8], opts: &DecodeOptions) -> Result<Value> {
    rdbkit_core::decode_from_payload_with(payload, opts)
}

/// Serializes `value` as a DUMP payload.
pub fn encode_payload(value: &Value) -> Result<Vec<u8>> {
    rdbkit_core::create_dump_payload(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_from_reader() {
        // list of "a" and 300 as int16
        let bytes = [0x01, 0x02, 0x01, b'a', 0xC1, 0x2C, 0x01];
        let value = decode(&bytes[..]).unwrap();
        assert_eq!(value.encoding(), Encoding::Linkedlist);
        let items = value.as_list().unwrap().to_vec().unwrap();
        assert_eq!(items, vec![RawValue::from("a"), RawValue::Int(300)]);
    }

    #[test]
    fn test_payload_roundtrip_through_facade() {
        let value = Value::string(vec![b'x'; 100]);
        let payload = encode_payload(&value).unwrap();
        let back = decode_payload(&payload).unwrap();
        assert_eq!(back, value);
        assert_eq!(back.encoding(), Encoding::Raw);
    }

    #[test]
    fn test_config_drives_decoding() {
        let mut config = Config::default();
        config.decode.max_version = 10;
        let payload = encode_payload(&Value::string("v")).unwrap();
        let err = decode_payload_with(&payload, &config.decode_options()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedVersion);
    }

    #[test]
    fn test_empty_reader() {
        let err = decode(&[0u8; 0][..]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedEof);
    }
}
