//! On-wire type codes and opcodes.
//!
//! The numeric values are assigned by the RDB format and never renumbered;
//! new types are appended.

use crate::error::RdbError;
use std::fmt;

/// Object type tag preceding every serialized value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TypeCode {
    String = 0,
    List = 1,
    Set = 2,
    ZSet = 3,
    Hash = 4,
    /// Sorted set with binary double scores.
    ZSet2 = 5,
    Module = 6,
    Module2 = 7,
    HashZipmap = 9,
    ListZiplist = 10,
    SetIntset = 11,
    ZSetZiplist = 12,
    HashZiplist = 13,
    ListQuicklist = 14,
    StreamListpacks = 15,
    HashListpack = 16,
    ZSetListpack = 17,
    ListQuicklist2 = 18,
    StreamListpacks2 = 19,
    SetListpack = 20,
    StreamListpacks3 = 21,
}

impl TypeCode {
    /// Returns the wire byte.
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for TypeCode {
    type Error = RdbError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(TypeCode::String),
            1 => Ok(TypeCode::List),
            2 => Ok(TypeCode::Set),
            3 => Ok(TypeCode::ZSet),
            4 => Ok(TypeCode::Hash),
            5 => Ok(TypeCode::ZSet2),
            6 => Ok(TypeCode::Module),
            7 => Ok(TypeCode::Module2),
            9 => Ok(TypeCode::HashZipmap),
            10 => Ok(TypeCode::ListZiplist),
            11 => Ok(TypeCode::SetIntset),
            12 => Ok(TypeCode::ZSetZiplist),
            13 => Ok(TypeCode::HashZiplist),
            14 => Ok(TypeCode::ListQuicklist),
            15 => Ok(TypeCode::StreamListpacks),
            16 => Ok(TypeCode::HashListpack),
            17 => Ok(TypeCode::ZSetListpack),
            18 => Ok(TypeCode::ListQuicklist2),
            19 => Ok(TypeCode::StreamListpacks2),
            20 => Ok(TypeCode::SetListpack),
            21 => Ok(TypeCode::StreamListpacks3),
            other => Err(RdbError::UnsupportedType(other)),
        }
    }
}

impl fmt::Display for TypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TypeCode::String => "STRING",
            TypeCode::List => "LIST",
            TypeCode::Set => "SET",
            TypeCode::ZSet => "ZSET",
            TypeCode::Hash => "HASH",
            TypeCode::ZSet2 => "ZSET_2",
            TypeCode::Module => "MODULE",
            TypeCode::Module2 => "MODULE_2",
            TypeCode::HashZipmap => "HASH_ZIPMAP",
            TypeCode::ListZiplist => "LIST_ZIPLIST",
            TypeCode::SetIntset => "SET_INTSET",
            TypeCode::ZSetZiplist => "ZSET_ZIPLIST",
            TypeCode::HashZiplist => "HASH_ZIPLIST",
            TypeCode::ListQuicklist => "LIST_QUICKLIST",
            TypeCode::StreamListpacks => "STREAM_LISTPACKS",
            TypeCode::HashListpack => "HASH_LISTPACK",
            TypeCode::ZSetListpack => "ZSET_LISTPACK",
            TypeCode::ListQuicklist2 => "LIST_QUICKLIST_2",
            TypeCode::StreamListpacks2 => "STREAM_LISTPACKS_2",
            TypeCode::SetListpack => "SET_LISTPACK",
            TypeCode::StreamListpacks3 => "STREAM_LISTPACKS_3",
        };
        write!(f, "{name}")
    }
}

/// Stream-level opcodes. These share the type byte position with
/// [`TypeCode`] and occupy the top of the byte range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    /// Cluster slot sizing hints of the following keys.
    SlotInfo = 244,
    /// Function library source code.
    Function2 = 245,
    /// Module auxiliary data.
    ModuleAux = 247,
    /// LRU idle time of the following key.
    Idle = 248,
    /// LFU frequency of the following key.
    Freq = 249,
    /// Auxiliary field (key/value metadata).
    Aux = 250,
    /// Hash table size hints for the current database.
    ResizeDb = 251,
    /// Expire time of the following key in milliseconds.
    ExpireTimeMs = 252,
    /// Expire time of the following key in seconds.
    ExpireTime = 253,
    /// Switch database.
    SelectDb = 254,
    /// End of the dump.
    Eof = 255,
}

impl Opcode {
    /// Classifies a type byte as an opcode, if it is one.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            244 => Some(Opcode::SlotInfo),
            245 => Some(Opcode::Function2),
            247 => Some(Opcode::ModuleAux),
            248 => Some(Opcode::Idle),
            249 => Some(Opcode::Freq),
            250 => Some(Opcode::Aux),
            251 => Some(Opcode::ResizeDb),
            252 => Some(Opcode::ExpireTimeMs),
            253 => Some(Opcode::ExpireTime),
            254 => Some(Opcode::SelectDb),
            255 => Some(Opcode::Eof),
            _ => None,
        }
    }
}
