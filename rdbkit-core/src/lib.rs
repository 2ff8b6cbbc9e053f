//! # rdbkit-core
//!
//! Object model for the Redis RDB format.
//!
//! This crate provides:
//! - Packed encodings (intset, ziplist, listpack, zipmap)
//! - Type-code dispatch from wire bytes to typed values
//! - Encoding-agnostic lazy iterators with copying and borrowing views
//! - Streams and opaque module values
//! - DUMP payload creation and verification
//! - Reference-counted value handles

pub mod compact;
pub mod dump;
pub mod iter;
pub mod module;
pub mod object;
pub mod options;
pub mod shared;
pub mod stream;
pub mod value;

pub use compact::{Intset, Listpack, Ziplist, Zipmap};
pub use dump::{create_dump_payload, decode_from_payload, decode_from_payload_with};
pub use iter::{HashIter, ListIter, SetIter, ZSetIter};
pub use module::{load_module_fields, module_type_id, module_type_name, ModuleField, ModuleValue};
pub use object::{decode_object, load_object, save_object};
pub use options::DecodeOptions;
pub use shared::SharedValue;
pub use stream::{
    Consumer, ConsumerGroup, PendingEntry, StreamEntry, StreamFormat, StreamId, StreamIter,
    StreamNode, StreamValue,
};
pub use value::{
    Encoding, HashValue, ListValue, ObjectKind, QuicklistNode, SetValue, Value, ZSetValue,
};
