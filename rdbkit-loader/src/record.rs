//! Records produced by the file loader.

use bytes::Bytes;
use chrono::{DateTime, TimeZone, Utc};
use rdbkit_codec::RawValue;
use rdbkit_core::{module_type_name, ModuleField, SharedValue};

/// One item of an RDB file, in file order.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    /// Auxiliary metadata such as `redis-ver` or `ctime`.
    Aux { key: Bytes, value: RawValue },
    /// Subsequent keys belong to this database.
    SelectDb(u64),
    /// Table size hints for the current database.
    ResizeDb { db_size: u64, expires_size: u64 },
    /// Slot sizing hints for the keys that follow, written by cluster nodes.
    SlotInfo {
        slot_id: u64,
        slot_size: u64,
        expires_slot_size: u64,
    },
    /// Source code of a function library.
    Function(Bytes),
    /// Module-global data, kept opaque.
    ModuleAux(ModuleAux),
    /// A key and its value.
    Entry(KeyEntry),
    /// End of file. `checksum` is `None` for files older than version 5
    /// and for files saved with checksums disabled.
    Eof { checksum: Option<u64> },
}

/// A key with its metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyEntry {
    pub db: u64,
    pub key: Bytes,
    /// Absolute expiry in Unix milliseconds.
    pub expire_at_ms: Option<i64>,
    /// LRU idle time in seconds.
    pub idle: Option<u64>,
    /// LFU access frequency.
    pub freq: Option<u8>,
    pub value: SharedValue,
}

impl KeyEntry {
    /// The expiry as a UTC timestamp, if the key has one that chrono can
    /// represent.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expire_at_ms
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
    }

    /// Whether the key is already expired at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|at| at <= now)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModuleAux {
    pub module_id: u64,
    /// Save phase the data was emitted in (before or after the keyspace).
    pub when: u64,
    pub fields: Vec<ModuleField>,
}

impl ModuleAux {
    pub fn module_name(&self) -> String {
        module_type_name(self.module_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdbkit_core::Value;

    fn entry(expire_at_ms: Option<i64>) -> KeyEntry {
        KeyEntry {
            db: 0,
            key: Bytes::from_static(b"k"),
            expire_at_ms,
            idle: None,
            freq: None,
            value: SharedValue::new(Value::string("v")),
        }
    }

    #[test]
    fn test_expiry_conversion() {
        let e = entry(Some(1_700_000_000_123));
        let at = e.expires_at().unwrap();
        assert_eq!(at.timestamp_millis(), 1_700_000_000_123);
        assert!(e.is_expired_at(at));
        assert!(!e.is_expired_at(at - chrono::Duration::milliseconds(1)));
    }

    #[test]
    fn test_no_expiry() {
        let e = entry(None);
        assert_eq!(e.expires_at(), None);
        assert!(!e.is_expired_at(Utc::now()));
    }
}
