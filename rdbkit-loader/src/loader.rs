//! Sequential RDB file reader.
//!
//! ```text
//! "REDIS" version(4 ASCII digits)
//! { opcode record | [EXPIRE*] [IDLE|FREQ] type key value }*
//!
//! opcode records: AUX, SELECTDB, RESIZEDB, SLOT_INFO, FUNCTION2, MODULE_AUX
//! EOF crc64(8, LE, version >= 5)
//! ```
//!
//! Expiry, idle and frequency opcodes attach to the key that follows them.

use crate::record::{KeyEntry, ModuleAux, Record};
use rdbkit_codec::{Opcode, RdbError, Result, Rio, TypeCode, RDB_MAGIC};
use rdbkit_core::{load_module_fields, load_object, DecodeOptions, SharedValue};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{debug, info, warn};

/// First version whose files end with a checksum.
const CHECKSUM_SINCE_VERSION: u16 = 5;

/// Module opcode announcing the unsigned "when" field of MODULE_AUX.
const MODULE_OPCODE_UINT: u64 = 2;

/// Reads an RDB file record by record.
///
/// Also an [`Iterator`] over `Result<Record>`; iteration stops after the
/// EOF record or the first error.
pub struct Loader<R: Read> {
    rio: Rio<R>,
    opts: DecodeOptions,
    version: u16,
    db: u64,
    keys: u64,
    finished: bool,
}

impl Loader<BufReader<File>> {
    /// Opens the file at `path` and reads its header.
    pub fn open(path: impl AsRef<Path>, opts: DecodeOptions) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::with_options(BufReader::new(file), opts)
    }
}

impl<R: Read> Loader<R> {
    /// Reads the header with default options.
    pub fn new(reader: R) -> Result<Self> {
        Self::with_options(reader, DecodeOptions::default())
    }

    /// Reads the header. Fails with `UnsupportedVersion` when the file is
    /// newer than `opts.max_version`.
    pub fn with_options(reader: R, opts: DecodeOptions) -> Result<Self> {
        let mut rio = Rio::new(reader);
        let header: [u8; 9] = rio.read_array()?;
        let (magic, digits) = header.split_at(RDB_MAGIC.len());
        if magic != RDB_MAGIC {
            return Err(RdbError::corrupted(0, "missing REDIS magic"));
        }
        let version = std::str::from_utf8(digits)
            .ok()
            .filter(|s| s.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|s| s.parse::<u16>().ok())
            .ok_or_else(|| RdbError::corrupted(RDB_MAGIC.len() as u64, "malformed version"))?;
        if version == 0 || version > opts.max_version {
            return Err(RdbError::UnsupportedVersion {
                version,
                max: opts.max_version,
            });
        }
        debug!(version, "opened rdb stream");
        Ok(Self {
            rio,
            opts,
            version,
            db: 0,
            keys: 0,
            finished: false,
        })
    }

    pub fn version(&self) -> u16 {
        self.version
    }

    /// Bytes consumed so far, header included.
    pub fn offset(&self) -> u64 {
        self.rio.tell()
    }

    /// Keys read so far.
    pub fn keys(&self) -> u64 {
        self.keys
    }

    /// Reads the next record; `None` once EOF has been returned.
    pub fn next_record(&mut self) -> Result<Option<Record>> {
        if self.finished {
            return Ok(None);
        }
        let mut expire_at_ms = None;
        let mut idle = None;
        let mut freq = None;
        loop {
            let at = self.rio.tell();
            let tag = self.rio.read_u8()?;
            let Some(opcode) = Opcode::from_u8(tag) else {
                let mut entry = self.load_entry(TypeCode::try_from(tag)?)?;
                entry.expire_at_ms = expire_at_ms;
                entry.idle = idle;
                entry.freq = freq;
                return Ok(Some(Record::Entry(entry)));
            };
            match opcode {
                Opcode::ExpireTime => expire_at_ms = Some(self.rio.load_time()? * 1000),
                Opcode::ExpireTimeMs => expire_at_ms = Some(self.rio.load_time_millis()?),
                Opcode::Idle => idle = Some(self.rio.load_len()?),
                Opcode::Freq => freq = Some(self.rio.read_u8()?),
                Opcode::Aux => {
                    let key = self.rio.load_string_bytes()?;
                    let value = self.rio.load_string_object()?;
                    return Ok(Some(Record::Aux { key, value }));
                }
                Opcode::SelectDb => {
                    self.db = self.rio.load_len()?;
                    debug!(db = self.db, "selected database");
                    return Ok(Some(Record::SelectDb(self.db)));
                }
                Opcode::ResizeDb => {
                    let db_size = self.rio.load_len()?;
                    let expires_size = self.rio.load_len()?;
                    debug!(db = self.db, db_size, expires_size, "resize hint");
                    return Ok(Some(Record::ResizeDb {
                        db_size,
                        expires_size,
                    }));
                }
                Opcode::SlotInfo => {
                    let slot_id = self.rio.load_len()?;
                    let slot_size = self.rio.load_len()?;
                    let expires_slot_size = self.rio.load_len()?;
                    debug!(slot_id, slot_size, expires_slot_size, "slot info");
                    return Ok(Some(Record::SlotInfo {
                        slot_id,
                        slot_size,
                        expires_slot_size,
                    }));
                }
                Opcode::Function2 => {
                    let code = self.rio.load_string_bytes()?;
                    debug!(bytes = code.len(), "function library");
                    return Ok(Some(Record::Function(code)));
                }
                Opcode::ModuleAux => return self.load_module_aux(at).map(Some),
                Opcode::Eof => return self.finish().map(Some),
            }
        }
    }

    fn load_entry(&mut self, code: TypeCode) -> Result<KeyEntry> {
        let key = self.rio.load_string_bytes()?;
        let value = load_object(&mut self.rio, code, &self.opts)?;
        self.keys += 1;
        Ok(KeyEntry {
            db: self.db,
            key,
            expire_at_ms: None,
            idle: None,
            freq: None,
            value: SharedValue::new(value),
        })
    }

    fn load_module_aux(&mut self, at: u64) -> Result<Record> {
        if !self.opts.skip_modules {
            return Err(RdbError::UnsupportedType(Opcode::ModuleAux as u8));
        }
        let module_id = self.rio.load_len()?;
        let when_opcode = self.rio.load_len()?;
        if when_opcode != MODULE_OPCODE_UINT {
            return Err(RdbError::corrupted(
                at,
                format!("module aux 'when' has opcode {when_opcode}"),
            ));
        }
        let when = self.rio.load_len()?;
        let fields = load_module_fields(&mut self.rio)?;
        let aux = ModuleAux {
            module_id,
            when,
            fields,
        };
        debug!(module = %aux.module_name(), when, "skipped module aux data");
        Ok(Record::ModuleAux(aux))
    }

    fn finish(&mut self) -> Result<Record> {
        self.finished = true;
        let mut checksum = None;
        if self.version >= CHECKSUM_SINCE_VERSION {
            let actual = self.rio.checksum();
            let expected = u64::from_le_bytes(self.rio.read_array()?);
            if expected == 0 {
                warn!("rdb file was saved without a checksum");
            } else {
                if self.opts.verify_checksum && expected != actual {
                    return Err(RdbError::ChecksumMismatch { expected, actual });
                }
                checksum = Some(expected);
            }
        }
        info!(
            version = self.version,
            keys = self.keys,
            bytes = self.rio.tell(),
            "rdb load complete"
        );
        Ok(Record::Eof { checksum })
    }
}

impl<R: Read> Iterator for Loader<R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_record() {
            Ok(record) => record.map(Ok),
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}
