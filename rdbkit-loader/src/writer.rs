//! Sequential RDB file writer.

use rdbkit_codec::{Opcode, Result, RioWriter, RDB_MAGIC, RDB_VERSION};
use rdbkit_core::{save_object, Value};
use std::io::Write;
use tracing::debug;

/// Writes an RDB file in the layout [`Loader`](crate::Loader) reads.
pub struct RdbWriter<W: Write> {
    w: RioWriter<W>,
    keys: u64,
}

impl<W: Write> RdbWriter<W> {
    /// Writes the header for [`RDB_VERSION`].
    pub fn new(sink: W) -> Result<Self> {
        let mut w = RioWriter::new(sink);
        w.write(RDB_MAGIC)?;
        w.write(format!("{RDB_VERSION:04}").as_bytes())?;
        Ok(Self { w, keys: 0 })
    }

    pub fn write_aux(&mut self, key: &str, value: &str) -> Result<()> {
        self.w.write_u8(Opcode::Aux as u8)?;
        self.w.save_raw_string(key.as_bytes())?;
        self.w.save_string(value.as_bytes())
    }

    pub fn select_db(&mut self, db: u64) -> Result<()> {
        self.w.write_u8(Opcode::SelectDb as u8)?;
        self.w.save_length(db)?;
        Ok(())
    }

    pub fn resize_db(&mut self, db_size: u64, expires_size: u64) -> Result<()> {
        self.w.write_u8(Opcode::ResizeDb as u8)?;
        self.w.save_length(db_size)?;
        self.w.save_length(expires_size)?;
        Ok(())
    }

    /// Writes a function library's source code.
    pub fn write_function(&mut self, code: &[u8]) -> Result<()> {
        self.w.write_u8(Opcode::Function2 as u8)?;
        self.w.save_raw_string(code)
    }

    pub fn slot_info(&mut self, slot_id: u64, slot_size: u64, expires_slot_size: u64) -> Result<()> {
        self.w.write_u8(Opcode::SlotInfo as u8)?;
        self.w.save_length(slot_id)?;
        self.w.save_length(slot_size)?;
        self.w.save_length(expires_slot_size)?;
        Ok(())
    }

    /// Writes a key, preceded by its millisecond expiry when it has one.
    pub fn write_entry(&mut self, key: &[u8], value: &Value, expire_at_ms: Option<i64>) -> Result<()> {
        if let Some(ms) = expire_at_ms {
            self.w.write_u8(Opcode::ExpireTimeMs as u8)?;
            self.w.save_time_millis(ms)?;
        }
        self.w.save_type(value.type_code())?;
        self.w.save_raw_string(key)?;
        save_object(&mut self.w, value)?;
        self.keys += 1;
        Ok(())
    }

    /// Writes EOF and the checksum trailer, returning the sink.
    pub fn finish(mut self) -> Result<W> {
        self.w.write_u8(Opcode::Eof as u8)?;
        let checksum = self.w.checksum();
        self.w.write(&checksum.to_le_bytes())?;
        self.w.flush()?;
        debug!(keys = self.keys, bytes = self.w.tell(), "rdb write complete");
        Ok(self.w.into_inner())
    }
}
