//! Opaque module values.
//!
//! A Module_2 body is a 64-bit module id followed by self-describing
//! fields, each prefixed by an opcode, up to an EOF opcode. Walking the
//! fields is enough to skip the value without loading the module.
//!
//! The id packs a 9-character type name (6 bits per character) above a
//! 10-bit encoding version.

use bytes::Bytes;
use rdbkit_codec::{RdbError, Result, Rio, RioWriter};
use std::io::{Read, Write};
use tracing::debug;

const OPCODE_EOF: u64 = 0;
const OPCODE_SINT: u64 = 1;
const OPCODE_UINT: u64 = 2;
const OPCODE_FLOAT: u64 = 3;
const OPCODE_DOUBLE: u64 = 4;
const OPCODE_STRING: u64 = 5;

const NAME_CHARSET: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";
const NAME_LEN: usize = 9;

/// One opcode-tagged field of a module value.
#[derive(Debug, Clone, PartialEq)]
pub enum ModuleField {
    SInt(i64),
    UInt(u64),
    Float(f32),
    Double(f64),
    String(Bytes),
}

/// A module value kept as its raw field sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleValue {
    pub id: u64,
    pub fields: Vec<ModuleField>,
}

impl ModuleValue {
    /// The module's 9-character type name.
    pub fn name(&self) -> String {
        module_type_name(self.id)
    }

    pub fn encoding_version(&self) -> u16 {
        (self.id & 0x3FF) as u16
    }
}

/// Decodes the type name packed in a module id.
pub fn module_type_name(id: u64) -> String {
    let mut rest = id >> 10;
    let mut name = [0u8; NAME_LEN];
    for slot in name.iter_mut().rev() {
        *slot = NAME_CHARSET[(rest & 63) as usize];
        rest >>= 6;
    }
    name.iter().map(|&c| c as char).collect()
}

/// Packs a type name and encoding version into a module id. `None` when the
/// name is not 9 characters from `A-Z a-z 0-9 - _` or the version needs
/// more than 10 bits.
pub fn module_type_id(name: &str, encoding_version: u16) -> Option<u64> {
    if name.len() != NAME_LEN || encoding_version > 0x3FF {
        return None;
    }
    let mut id = 0u64;
    for c in name.bytes() {
        let pos = NAME_CHARSET.iter().position(|&x| x == c)?;
        id = (id << 6) | pos as u64;
    }
    Some((id << 10) | u64::from(encoding_version))
}

/// Reads opcode-tagged fields up to and including the EOF opcode.
pub fn load_module_fields<R: Read>(rio: &mut Rio<R>) -> Result<Vec<ModuleField>> {
    let mut fields = Vec::new();
    loop {
        let at = rio.tell();
        let field = match rio.load_len()? {
            OPCODE_EOF => return Ok(fields),
            OPCODE_SINT => ModuleField::SInt(rio.load_len()? as i64),
            OPCODE_UINT => ModuleField::UInt(rio.load_len()?),
            OPCODE_FLOAT => ModuleField::Float(rio.load_binary_float()?),
            OPCODE_DOUBLE => ModuleField::Double(rio.load_binary_double()?),
            OPCODE_STRING => ModuleField::String(rio.load_string_bytes()?),
            other => {
                return Err(RdbError::corrupted(
                    at,
                    format!("unknown module opcode {other}"),
                ))
            }
        };
        fields.push(field);
    }
}

/// Writes fields followed by the EOF opcode.
pub fn save_module_fields<W: Write>(w: &mut RioWriter<W>, fields: &[ModuleField]) -> Result<()> {
    for field in fields {
        match field {
            ModuleField::SInt(v) => {
                w.save_length(OPCODE_SINT)?;
                w.save_length(*v as u64)?;
            }
            ModuleField::UInt(v) => {
                w.save_length(OPCODE_UINT)?;
                w.save_length(*v)?;
            }
            ModuleField::Float(v) => {
                w.save_length(OPCODE_FLOAT)?;
                w.save_binary_float(*v)?;
            }
            ModuleField::Double(v) => {
                w.save_length(OPCODE_DOUBLE)?;
                w.save_binary_double(*v)?;
            }
            ModuleField::String(s) => {
                w.save_length(OPCODE_STRING)?;
                w.save_raw_string(s)?;
            }
        }
    }
    w.save_length(OPCODE_EOF)?;
    Ok(())
}

/// Reads a Module_2 object body.
pub(crate) fn load_module2<R: Read>(rio: &mut Rio<R>) -> Result<ModuleValue> {
    let id = rio.load_len()?;
    let fields = load_module_fields(rio)?;
    debug!(
        module = %module_type_name(id),
        fields = fields.len(),
        "skipped module value"
    );
    Ok(ModuleValue { id, fields })
}

pub(crate) fn save_module<W: Write>(w: &mut RioWriter<W>, module: &ModuleValue) -> Result<()> {
    w.save_length(module.id)?;
    save_module_fields(w, &module.fields)
}
