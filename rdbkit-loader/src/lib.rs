//! # rdbkit-loader
//!
//! Whole-file RDB reading and writing for rdbkit.
//!
//! This crate provides:
//! - Header validation and version gating
//! - A record iterator over the opcode stream
//! - Key metadata (expiry, LRU idle, LFU frequency)
//! - Trailing checksum verification
//! - A writer producing files the loader reads

pub mod loader;
pub mod record;
pub mod writer;

pub use loader::Loader;
pub use record::{KeyEntry, ModuleAux, Record};
pub use writer::RdbWriter;
