//! The decoded value model.
//!
//! A [`Value`] is a closed sum over the object kinds. Each collection keeps
//! the physical representation it was decoded from (canonical vectors or a
//! packed blob); its [`Encoding`] and wire [`TypeCode`] are derived from that
//! representation and therefore always agree.
//!
//! Whole-value accessors come in two flavours: copying ones (`to_vec`,
//! `to_map`, `to_set`) return owned data, borrowing ones (`items`, `pairs`,
//! `members`) return [`RawRef`]s tied to the value's lifetime. Both drain the
//! collection's iterator.

use crate::compact::{Intset, Listpack, Ziplist, Zipmap};
use crate::iter::{HashIter, ListIter, SetIter, ZSetIter};
use crate::module::ModuleValue;
use crate::stream::StreamValue;
use bytes::Bytes;
use rdbkit_codec::{RawRef, RawValue, Result, TypeCode};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Longest string stored inline with its object header.
const EMBSTR_MAX_LEN: usize = 44;

/// Physical layout of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encoding {
    Raw,
    Int,
    Ht,
    Zipmap,
    Linkedlist,
    Ziplist,
    Intset,
    Skiplist,
    Embstr,
    Quicklist,
    Stream,
    Listpack,
}

impl Encoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            Encoding::Raw => "raw",
            Encoding::Int => "int",
            Encoding::Ht => "hashtable",
            Encoding::Zipmap => "zipmap",
            Encoding::Linkedlist => "linkedlist",
            Encoding::Ziplist => "ziplist",
            Encoding::Intset => "intset",
            Encoding::Skiplist => "skiplist",
            Encoding::Embstr => "embstr",
            Encoding::Quicklist => "quicklist",
            Encoding::Stream => "stream",
            Encoding::Listpack => "listpack",
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Logical kind of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    String,
    List,
    Set,
    ZSet,
    Hash,
    Stream,
    Module,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ObjectKind::String => "string",
            ObjectKind::List => "list",
            ObjectKind::Set => "set",
            ObjectKind::ZSet => "zset",
            ObjectKind::Hash => "hash",
            ObjectKind::Stream => "stream",
            ObjectKind::Module => "module",
        };
        f.write_str(name)
    }
}

/// A decoded object.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(RawValue),
    List(ListValue),
    Set(SetValue),
    ZSet(ZSetValue),
    Hash(HashValue),
    Stream(Box<StreamValue>),
    Module(ModuleValue),
}

impl Value {
    pub fn string(value: impl Into<RawValue>) -> Self {
        Value::String(value.into())
    }

    pub fn kind(&self) -> ObjectKind {
        match self {
            Value::String(_) => ObjectKind::String,
            Value::List(_) => ObjectKind::List,
            Value::Set(_) => ObjectKind::Set,
            Value::ZSet(_) => ObjectKind::ZSet,
            Value::Hash(_) => ObjectKind::Hash,
            Value::Stream(_) => ObjectKind::Stream,
            Value::Module(_) => ObjectKind::Module,
        }
    }

    pub fn encoding(&self) -> Encoding {
        match self {
            Value::String(RawValue::Int(_)) => Encoding::Int,
            Value::String(RawValue::Bytes(b)) if b.len() <= EMBSTR_MAX_LEN => Encoding::Embstr,
            Value::String(RawValue::Bytes(_)) => Encoding::Raw,
            Value::List(list) => list.encoding(),
            Value::Set(set) => set.encoding(),
            Value::ZSet(zset) => zset.encoding(),
            Value::Hash(hash) => hash.encoding(),
            Value::Stream(_) => Encoding::Stream,
            Value::Module(_) => Encoding::Raw,
        }
    }

    /// The type code this value is written with.
    pub fn type_code(&self) -> TypeCode {
        match self {
            Value::String(_) => TypeCode::String,
            Value::List(list) => list.type_code(),
            Value::Set(set) => set.type_code(),
            Value::ZSet(zset) => zset.type_code(),
            Value::Hash(hash) => hash.type_code(),
            Value::Stream(stream) => stream.format.type_code(),
            Value::Module(_) => TypeCode::Module2,
        }
    }

    pub fn as_string(&self) -> Option<&RawValue> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&ListValue> {
        match self {
            Value::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_set(&self) -> Option<&SetValue> {
        match self {
            Value::Set(set) => Some(set),
            _ => None,
        }
    }

    pub fn as_zset(&self) -> Option<&ZSetValue> {
        match self {
            Value::ZSet(zset) => Some(zset),
            _ => None,
        }
    }

    pub fn as_hash(&self) -> Option<&HashValue> {
        match self {
            Value::Hash(hash) => Some(hash),
            _ => None,
        }
    }

    pub fn as_stream(&self) -> Option<&StreamValue> {
        match self {
            Value::Stream(stream) => Some(stream),
            _ => None,
        }
    }

    pub fn as_module(&self) -> Option<&ModuleValue> {
        match self {
            Value::Module(module) => Some(module),
            _ => None,
        }
    }
}

/// One node of a listpack-era quicklist.
#[derive(Debug, Clone, PartialEq)]
pub enum QuicklistNode {
    /// A single element too large to pack.
    Plain(RawValue),
    Packed(Listpack),
}

impl QuicklistNode {
    pub fn len(&self) -> usize {
        match self {
            QuicklistNode::Plain(_) => 1,
            QuicklistNode::Packed(lp) => lp.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A list.
#[derive(Debug, Clone, PartialEq)]
pub enum ListValue {
    Linked(Vec<RawValue>),
    Ziplist(Ziplist),
    /// Quicklist of ziplist nodes.
    Quicklist(Vec<Ziplist>),
    /// Quicklist of listpack or plain nodes.
    Quicklist2(Vec<QuicklistNode>),
}

impl ListValue {
    pub fn encoding(&self) -> Encoding {
        match self {
            ListValue::Linked(_) => Encoding::Linkedlist,
            ListValue::Ziplist(_) => Encoding::Ziplist,
            ListValue::Quicklist(_) | ListValue::Quicklist2(_) => Encoding::Quicklist,
        }
    }

    pub fn type_code(&self) -> TypeCode {
        match self {
            ListValue::Linked(_) => TypeCode::List,
            ListValue::Ziplist(_) => TypeCode::ListZiplist,
            ListValue::Quicklist(_) => TypeCode::ListQuicklist,
            ListValue::Quicklist2(_) => TypeCode::ListQuicklist2,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ListValue::Linked(items) => items.len(),
            ListValue::Ziplist(zl) => zl.len(),
            ListValue::Quicklist(nodes) => nodes.iter().map(Ziplist::len).sum(),
            ListValue::Quicklist2(nodes) => nodes.iter().map(QuicklistNode::len).sum(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> ListIter<'_> {
        ListIter::new(self)
    }

    /// Copies every element out, in order.
    pub fn to_vec(&self) -> Result<Vec<RawValue>> {
        self.iter().map(|item| item.map(RawRef::into_owned)).collect()
    }

    /// Borrows every element, in order.
    pub fn items(&self) -> Result<Vec<RawRef<'_>>> {
        self.iter().collect()
    }
}

/// A hash.
#[derive(Debug, Clone, PartialEq)]
pub enum HashValue {
    Table(Vec<(RawValue, RawValue)>),
    Zipmap(Zipmap),
    /// Alternating field and value entries.
    Ziplist(Ziplist),
    /// Alternating field and value entries.
    Listpack(Listpack),
}

impl HashValue {
    pub fn encoding(&self) -> Encoding {
        match self {
            HashValue::Table(_) => Encoding::Ht,
            HashValue::Zipmap(_) => Encoding::Zipmap,
            HashValue::Ziplist(_) => Encoding::Ziplist,
            HashValue::Listpack(_) => Encoding::Listpack,
        }
    }

    pub fn type_code(&self) -> TypeCode {
        match self {
            HashValue::Table(_) => TypeCode::Hash,
            HashValue::Zipmap(_) => TypeCode::HashZipmap,
            HashValue::Ziplist(_) => TypeCode::HashZiplist,
            HashValue::Listpack(_) => TypeCode::HashListpack,
        }
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        match self {
            HashValue::Table(pairs) => pairs.len(),
            HashValue::Zipmap(zm) => zm.len(),
            HashValue::Ziplist(zl) => zl.len() / 2,
            HashValue::Listpack(lp) => lp.len() / 2,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> HashIter<'_> {
        HashIter::new(self)
    }

    /// Copies the hash out as a field to value map.
    pub fn to_map(&self) -> Result<HashMap<Bytes, Bytes>> {
        self.iter()
            .map(|pair| pair.map(|(field, value)| (field.to_bytes(), value.to_bytes())))
            .collect()
    }

    /// Borrows every field/value pair, in stored order.
    pub fn pairs(&self) -> Result<Vec<(RawRef<'_>, RawRef<'_>)>> {
        self.iter().collect()
    }
}

/// A set.
#[derive(Debug, Clone, PartialEq)]
pub enum SetValue {
    Table(Vec<RawValue>),
    Intset(Intset),
    Listpack(Listpack),
}

impl SetValue {
    pub fn encoding(&self) -> Encoding {
        match self {
            SetValue::Table(_) => Encoding::Ht,
            SetValue::Intset(_) => Encoding::Intset,
            SetValue::Listpack(_) => Encoding::Listpack,
        }
    }

    pub fn type_code(&self) -> TypeCode {
        match self {
            SetValue::Table(_) => TypeCode::Set,
            SetValue::Intset(_) => TypeCode::SetIntset,
            SetValue::Listpack(_) => TypeCode::SetListpack,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            SetValue::Table(members) => members.len(),
            SetValue::Intset(set) => set.len(),
            SetValue::Listpack(lp) => lp.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> SetIter<'_> {
        SetIter::new(self)
    }

    /// Copies the members out.
    pub fn to_set(&self) -> Result<HashSet<Bytes>> {
        self.iter()
            .map(|member| member.map(|m| m.to_bytes()))
            .collect()
    }

    /// Borrows every member, in stored order.
    pub fn members(&self) -> Result<Vec<RawRef<'_>>> {
        self.iter().collect()
    }
}

/// A sorted set.
#[derive(Debug, Clone, PartialEq)]
pub enum ZSetValue {
    Skiplist {
        entries: Vec<(RawValue, f64)>,
        /// Scores are written as binary doubles rather than ASCII.
        binary_scores: bool,
    },
    /// Alternating member and score entries.
    Ziplist(Ziplist),
    /// Alternating member and score entries.
    Listpack(Listpack),
}

impl ZSetValue {
    pub fn encoding(&self) -> Encoding {
        match self {
            ZSetValue::Skiplist { .. } => Encoding::Skiplist,
            ZSetValue::Ziplist(_) => Encoding::Ziplist,
            ZSetValue::Listpack(_) => Encoding::Listpack,
        }
    }

    pub fn type_code(&self) -> TypeCode {
        match self {
            ZSetValue::Skiplist {
                binary_scores: true,
                ..
            } => TypeCode::ZSet2,
            ZSetValue::Skiplist { .. } => TypeCode::ZSet,
            ZSetValue::Ziplist(_) => TypeCode::ZSetZiplist,
            ZSetValue::Listpack(_) => TypeCode::ZSetListpack,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ZSetValue::Skiplist { entries, .. } => entries.len(),
            ZSetValue::Ziplist(zl) => zl.len() / 2,
            ZSetValue::Listpack(lp) => lp.len() / 2,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> ZSetIter<'_> {
        ZSetIter::new(self)
    }

    /// Copies the sorted set out as a member to score map.
    pub fn to_map(&self) -> Result<HashMap<Bytes, f64>> {
        self.iter()
            .map(|entry| entry.map(|(member, score)| (member.to_bytes(), score)))
            .collect()
    }

    /// Borrows every member with its score, in stored order.
    pub fn members(&self) -> Result<Vec<(RawRef<'_>, f64)>> {
        self.iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_encodings() {
        assert_eq!(Value::string(12345i64).encoding(), Encoding::Int);
        assert_eq!(Value::string("short").encoding(), Encoding::Embstr);
        assert_eq!(Value::string("x".repeat(44).as_str()).encoding(), Encoding::Embstr);
        assert_eq!(Value::string("x".repeat(45).as_str()).encoding(), Encoding::Raw);
        assert_eq!(Value::string("v").type_code(), TypeCode::String);
    }

    #[test]
    fn test_encoding_follows_representation() {
        let zl = Ziplist::from_entries([RawRef::Bytes(b"f"), RawRef::Bytes(b"v")]);
        let hash = Value::Hash(HashValue::Ziplist(zl));
        assert_eq!(hash.encoding(), Encoding::Ziplist);
        assert_eq!(hash.type_code(), TypeCode::HashZiplist);
        assert_eq!(hash.kind(), ObjectKind::Hash);

        let set = Value::Set(SetValue::Intset(Intset::from_values([1, 2])));
        assert_eq!(set.encoding(), Encoding::Intset);
        assert_eq!(set.type_code(), TypeCode::SetIntset);

        let zset = ZSetValue::Skiplist {
            entries: vec![],
            binary_scores: false,
        };
        assert_eq!(zset.type_code(), TypeCode::ZSet);
        assert_eq!(zset.encoding(), Encoding::Skiplist);
    }

    #[test]
    fn test_list_views() {
        let list = ListValue::Quicklist2(vec![
            QuicklistNode::Packed(Listpack::from_entries([RawRef::Bytes(b"a"), RawRef::Int(2)])),
            QuicklistNode::Plain(RawValue::from("big")),
        ]);
        assert_eq!(list.len(), 3);
        assert_eq!(list.encoding(), Encoding::Quicklist);

        let owned = list.to_vec().unwrap();
        assert_eq!(
            owned,
            vec![RawValue::from("a"), RawValue::Int(2), RawValue::from("big")]
        );
        let borrowed = list.items().unwrap();
        assert_eq!(borrowed[1].to_string(), "2");
    }

    #[test]
    fn test_hash_to_map() {
        let hash = HashValue::Listpack(Listpack::from_entries([
            RawRef::Bytes(b"name"),
            RawRef::Bytes(b"redis"),
            RawRef::Bytes(b"port"),
            RawRef::Int(6379),
        ]));
        assert_eq!(hash.len(), 2);
        let map = hash.to_map().unwrap();
        assert_eq!(map[&Bytes::from_static(b"port")], Bytes::from_static(b"6379"));
    }

    #[test]
    fn test_zset_scores_from_packed_entries() {
        let zset = ZSetValue::Ziplist(Ziplist::from_entries([
            RawRef::Bytes(b"a"),
            RawRef::Int(1),
            RawRef::Bytes(b"b"),
            RawRef::Bytes(b"2.5"),
        ]));
        let members = zset.members().unwrap();
        assert_eq!(members[0].1, 1.0);
        assert_eq!(members[1], (RawRef::Bytes(b"b"), 2.5));
    }

    #[test]
    fn test_set_to_set() {
        let set = SetValue::Intset(Intset::from_values([3, 1]));
        let members = set.to_set().unwrap();
        assert!(members.contains(&Bytes::from_static(b"1")));
        assert!(members.contains(&Bytes::from_static(b"3")));
        assert_eq!(set.members().unwrap(), vec![RawRef::Int(1), RawRef::Int(3)]);
    }
}
