//! Object type dispatch.
//!
//! Reads and writes the body that follows a type code. Canonical
//! collections are materialized; packed variants keep their blob, which
//! is validated once here so that a [`Value`] that exists is sound.
//!
//! ```text
//! [type:u8] ─┬─ String          string object
//!            ├─ List/Set        count, string objects
//!            ├─ ZSet/ZSet2      count, (member, score)
//!            ├─ Hash            count, (field, value)
//!            ├─ *Ziplist/*Listpack/Intset/Zipmap   one blob
//!            ├─ Quicklist(2)    count, nodes
//!            ├─ Stream*         see stream module
//!            └─ Module2         id, opcode fields
//! ```

use crate::compact::{Intset, Listpack, Ziplist, Zipmap};
use crate::module::{load_module2, save_module};
use crate::options::DecodeOptions;
use crate::stream::{load_stream, save_stream, StreamFormat};
use crate::value::{HashValue, ListValue, QuicklistNode, SetValue, Value, ZSetValue};
use bytes::Bytes;
use rdbkit_codec::{RawRef, RawValue, RdbError, Result, Rio, RioWriter, TypeCode};
use std::borrow::Cow;
use std::collections::HashSet;
use std::io::{Read, Write};
use tracing::{debug, trace};

/// Upper bound on capacity reserved from an untrusted count.
const MAX_PREALLOC: usize = 1024;

const QUICKLIST_NODE_PLAIN: u64 = 1;
const QUICKLIST_NODE_PACKED: u64 = 2;

/// Reads a type code and the object body that follows it.
pub fn decode_object<R: Read>(rio: &mut Rio<R>, opts: &DecodeOptions) -> Result<Value> {
    let code = rio.load_type()?;
    load_object(rio, code, opts)
}

/// Reads the body of an object whose type code is `code`.
pub fn load_object<R: Read>(rio: &mut Rio<R>, code: TypeCode, opts: &DecodeOptions) -> Result<Value> {
    let start = rio.tell();
    let value = match code {
        TypeCode::String => Value::String(rio.load_string_object()?),
        TypeCode::List => Value::List(ListValue::Linked(load_list(rio)?)),
        TypeCode::Set => Value::Set(SetValue::Table(load_set(rio)?)),
        TypeCode::ZSet | TypeCode::ZSet2 => {
            let binary_scores = code == TypeCode::ZSet2;
            Value::ZSet(ZSetValue::Skiplist {
                entries: load_zset(rio, binary_scores)?,
                binary_scores,
            })
        }
        TypeCode::Hash => Value::Hash(HashValue::Table(load_hash(rio)?)),
        TypeCode::Module => return Err(RdbError::UnsupportedType(code.as_u8())),
        TypeCode::Module2 => {
            if !opts.skip_modules {
                return Err(RdbError::UnsupportedType(code.as_u8()));
            }
            Value::Module(load_module2(rio)?)
        }
        TypeCode::HashZipmap => Value::Hash(HashValue::Zipmap(load_blob(rio, Zipmap::new)?)),
        TypeCode::ListZiplist => Value::List(ListValue::Ziplist(load_blob(rio, Ziplist::new)?)),
        TypeCode::SetIntset => Value::Set(SetValue::Intset(load_blob(rio, Intset::new)?)),
        TypeCode::ZSetZiplist => {
            let at = rio.tell();
            let zset = ZSetValue::Ziplist(load_blob(rio, Ziplist::new)?);
            check_zset(&zset).map_err(|e| e.rebase(at))?;
            Value::ZSet(zset)
        }
        TypeCode::HashZiplist => {
            let at = rio.tell();
            let hash = HashValue::Ziplist(load_blob(rio, Ziplist::new)?);
            check_hash(&hash).map_err(|e| e.rebase(at))?;
            Value::Hash(hash)
        }
        TypeCode::ListQuicklist => Value::List(ListValue::Quicklist(load_quicklist(rio)?)),
        TypeCode::StreamListpacks | TypeCode::StreamListpacks2 | TypeCode::StreamListpacks3 => {
            let format = StreamFormat::from_type_code(code)
                .ok_or(RdbError::UnsupportedType(code.as_u8()))?;
            Value::Stream(Box::new(load_stream(rio, format)?))
        }
        TypeCode::HashListpack => {
            let at = rio.tell();
            let hash = HashValue::Listpack(load_blob(rio, Listpack::new)?);
            check_hash(&hash).map_err(|e| e.rebase(at))?;
            Value::Hash(hash)
        }
        TypeCode::ZSetListpack => {
            let at = rio.tell();
            let zset = ZSetValue::Listpack(load_blob(rio, Listpack::new)?);
            check_zset(&zset).map_err(|e| e.rebase(at))?;
            Value::ZSet(zset)
        }
        TypeCode::ListQuicklist2 => Value::List(ListValue::Quicklist2(load_quicklist2(rio)?)),
        TypeCode::SetListpack => {
            let at = rio.tell();
            let set = SetValue::Listpack(load_blob(rio, Listpack::new)?);
            check_set(&set).map_err(|e| e.rebase(at))?;
            Value::Set(set)
        }
    };
    trace!(
        type_code = %code,
        encoding = %value.encoding(),
        bytes = rio.tell() - start,
        "loaded object"
    );
    Ok(value)
}

/// Reads a length-prefixed blob and validates it with `parse`.
fn load_blob<R: Read, T>(rio: &mut Rio<R>, parse: fn(Bytes) -> Result<T>) -> Result<T> {
    let at = rio.tell();
    let blob = rio.load_string_bytes()?;
    parse(blob).map_err(|e| e.rebase(at))
}

fn load_list<R: Read>(rio: &mut Rio<R>) -> Result<Vec<RawValue>> {
    let count = rio.load_usize()?;
    let mut items = Vec::with_capacity(count.min(MAX_PREALLOC));
    for _ in 0..count {
        items.push(rio.load_string_object()?);
    }
    Ok(items)
}

fn load_set<R: Read>(rio: &mut Rio<R>) -> Result<Vec<RawValue>> {
    let count = rio.load_usize()?;
    let mut members = Vec::with_capacity(count.min(MAX_PREALLOC));
    let mut seen = HashSet::with_capacity(count.min(MAX_PREALLOC));
    for _ in 0..count {
        let at = rio.tell();
        let member = rio.load_string_object()?;
        if !seen.insert(member.to_bytes()) {
            return Err(RdbError::corrupted(at, format!("duplicate set member '{member}'")));
        }
        members.push(member);
    }
    Ok(members)
}

fn load_zset<R: Read>(rio: &mut Rio<R>, binary_scores: bool) -> Result<Vec<(RawValue, f64)>> {
    let count = rio.load_usize()?;
    let mut entries = Vec::with_capacity(count.min(MAX_PREALLOC));
    let mut seen = HashSet::with_capacity(count.min(MAX_PREALLOC));
    for _ in 0..count {
        let at = rio.tell();
        let member = rio.load_string_object()?;
        let score = if binary_scores {
            rio.load_binary_double()?
        } else {
            rio.load_double_value()?
        };
        if score.is_nan() {
            return Err(RdbError::corrupted(at, format!("NaN score for member '{member}'")));
        }
        if !seen.insert(member.to_bytes()) {
            return Err(RdbError::corrupted(at, format!("duplicate zset member '{member}'")));
        }
        entries.push((member, score));
    }
    Ok(entries)
}

fn load_hash<R: Read>(rio: &mut Rio<R>) -> Result<Vec<(RawValue, RawValue)>> {
    let count = rio.load_usize()?;
    let mut pairs = Vec::with_capacity(count.min(MAX_PREALLOC));
    let mut seen = HashSet::with_capacity(count.min(MAX_PREALLOC));
    for _ in 0..count {
        let at = rio.tell();
        let field = rio.load_string_object()?;
        let value = rio.load_string_object()?;
        if !seen.insert(field.to_bytes()) {
            return Err(RdbError::corrupted(at, format!("duplicate hash field '{field}'")));
        }
        pairs.push((field, value));
    }
    Ok(pairs)
}

fn load_quicklist<R: Read>(rio: &mut Rio<R>) -> Result<Vec<Ziplist>> {
    let count = rio.load_usize()?;
    let mut nodes = Vec::with_capacity(count.min(MAX_PREALLOC));
    for index in 0..count {
        let node = load_blob(rio, Ziplist::new)?;
        if node.is_empty() {
            debug!(index, "skipping empty quicklist node");
            continue;
        }
        nodes.push(node);
    }
    Ok(nodes)
}

fn load_quicklist2<R: Read>(rio: &mut Rio<R>) -> Result<Vec<QuicklistNode>> {
    let count = rio.load_usize()?;
    let mut nodes = Vec::with_capacity(count.min(MAX_PREALLOC));
    for index in 0..count {
        let node = match rio.load_len()? {
            QUICKLIST_NODE_PLAIN => QuicklistNode::Plain(RawValue::Bytes(rio.load_string_bytes()?)),
            QUICKLIST_NODE_PACKED => {
                let lp = load_blob(rio, Listpack::new)?;
                if lp.is_empty() {
                    debug!(index, "skipping empty quicklist node");
                    continue;
                }
                QuicklistNode::Packed(lp)
            }
            tag => {
                return Err(RdbError::UnsupportedEncoding {
                    context: "quicklist node container",
                    tag,
                })
            }
        };
        nodes.push(node);
    }
    Ok(nodes)
}

fn insert_unique<'a>(
    seen: &mut HashSet<Cow<'a, [u8]>>,
    item: RawRef<'a>,
    what: &str,
) -> Result<()> {
    if seen.insert(item.as_bytes()) {
        Ok(())
    } else {
        Err(RdbError::corrupted(0, format!("duplicate {what} '{item}'")))
    }
}

fn check_hash(hash: &HashValue) -> Result<()> {
    let mut seen = HashSet::with_capacity(hash.len().min(MAX_PREALLOC));
    for pair in hash.iter() {
        let (field, _) = pair?;
        insert_unique(&mut seen, field, "hash field")?;
    }
    Ok(())
}

fn check_zset(zset: &ZSetValue) -> Result<()> {
    let mut seen = HashSet::with_capacity(zset.len().min(MAX_PREALLOC));
    for entry in zset.iter() {
        let (member, _) = entry?;
        insert_unique(&mut seen, member, "zset member")?;
    }
    Ok(())
}

fn check_set(set: &SetValue) -> Result<()> {
    let mut seen = HashSet::with_capacity(set.len().min(MAX_PREALLOC));
    for member in set.iter() {
        insert_unique(&mut seen, member?, "set member")?;
    }
    Ok(())
}

/// Writes the body of `value`; the caller writes its type code.
pub fn save_object<W: Write>(w: &mut RioWriter<W>, value: &Value) -> Result<()> {
    match value {
        Value::String(s) => w.save_raw_value(s.as_raw()),
        Value::List(list) => save_list(w, list),
        Value::Set(set) => match set {
            SetValue::Table(members) => {
                w.save_length(members.len() as u64)?;
                for member in members {
                    w.save_raw_value(member.as_raw())?;
                }
                Ok(())
            }
            SetValue::Intset(is) => w.save_raw_string(is.as_bytes()),
            SetValue::Listpack(lp) => w.save_raw_string(lp.as_bytes()),
        },
        Value::ZSet(zset) => match zset {
            ZSetValue::Skiplist {
                entries,
                binary_scores,
            } => {
                w.save_length(entries.len() as u64)?;
                for (member, score) in entries {
                    w.save_raw_value(member.as_raw())?;
                    if *binary_scores {
                        w.save_binary_double(*score)?;
                    } else {
                        w.save_double_value(*score)?;
                    }
                }
                Ok(())
            }
            ZSetValue::Ziplist(zl) => w.save_raw_string(zl.as_bytes()),
            ZSetValue::Listpack(lp) => w.save_raw_string(lp.as_bytes()),
        },
        Value::Hash(hash) => match hash {
            HashValue::Table(pairs) => {
                w.save_length(pairs.len() as u64)?;
                for (field, value) in pairs {
                    w.save_raw_value(field.as_raw())?;
                    w.save_raw_value(value.as_raw())?;
                }
                Ok(())
            }
            HashValue::Zipmap(zm) => w.save_raw_string(zm.as_bytes()),
            HashValue::Ziplist(zl) => w.save_raw_string(zl.as_bytes()),
            HashValue::Listpack(lp) => w.save_raw_string(lp.as_bytes()),
        },
        Value::Stream(stream) => save_stream(w, stream),
        Value::Module(module) => save_module(w, module),
    }
}

fn save_list<W: Write>(w: &mut RioWriter<W>, list: &ListValue) -> Result<()> {
    match list {
        ListValue::Linked(items) => {
            w.save_length(items.len() as u64)?;
            for item in items {
                w.save_raw_value(item.as_raw())?;
            }
        }
        ListValue::Ziplist(zl) => w.save_raw_string(zl.as_bytes())?,
        ListValue::Quicklist(nodes) => {
            w.save_length(nodes.len() as u64)?;
            for node in nodes {
                w.save_raw_string(node.as_bytes())?;
            }
        }
        ListValue::Quicklist2(nodes) => {
            w.save_length(nodes.len() as u64)?;
            for node in nodes {
                match node {
                    QuicklistNode::Plain(v) => {
                        w.save_length(QUICKLIST_NODE_PLAIN)?;
                        w.save_raw_string(&v.to_bytes())?;
                    }
                    QuicklistNode::Packed(lp) => {
                        w.save_length(QUICKLIST_NODE_PACKED)?;
                        w.save_raw_string(lp.as_bytes())?;
                    }
                }
            }
        }
    }
    Ok(())
}
