//! Decode error types and error kinds.

use std::fmt;
use thiserror::Error;

/// Errors that can occur while decoding or encoding RDB data.
///
/// Every error is terminal for the decode call that produced it; nothing is
/// retried internally and no partially built value is returned.
#[derive(Debug, Error)]
pub enum RdbError {
    #[error("unexpected end of stream at offset {offset}: needed {needed} bytes, got {available}")]
    UnexpectedEof {
        offset: u64,
        needed: usize,
        available: usize,
    },

    #[error("corrupted payload at offset {offset}: {reason}")]
    CorruptedPayload { offset: u64, reason: String },

    #[error("checksum mismatch: expected {expected:#018x}, got {actual:#018x}")]
    ChecksumMismatch { expected: u64, actual: u64 },

    #[error("unsupported object type: {0}")]
    UnsupportedType(u8),

    #[error("unsupported {context} encoding: {tag:#04x}")]
    UnsupportedEncoding { context: &'static str, tag: u64 },

    #[error("unsupported RDB version: {version} (max {max})")]
    UnsupportedVersion { version: u16, max: u16 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RdbError {
    /// Shorthand for a [`RdbError::CorruptedPayload`] at `offset`.
    pub fn corrupted(offset: u64, reason: impl Into<String>) -> Self {
        RdbError::CorruptedPayload {
            offset,
            reason: reason.into(),
        }
    }

    /// Shifts the offset of a positional error by `base`.
    ///
    /// Packed blobs are decoded against their own buffer; this maps their
    /// errors back onto the enclosing stream.
    pub fn rebase(self, base: u64) -> Self {
        match self {
            RdbError::UnexpectedEof {
                offset,
                needed,
                available,
            } => RdbError::UnexpectedEof {
                offset: base + offset,
                needed,
                available,
            },
            RdbError::CorruptedPayload { offset, reason } => RdbError::CorruptedPayload {
                offset: base + offset,
                reason,
            },
            other => other,
        }
    }

    /// Returns the error kind this error reports as.
    pub fn kind(&self) -> ErrorKind {
        match self {
            RdbError::UnexpectedEof { .. } => ErrorKind::UnexpectedEof,
            RdbError::CorruptedPayload { .. } => ErrorKind::CorruptedPayload,
            RdbError::ChecksumMismatch { .. } => ErrorKind::CorruptedPayload,
            RdbError::UnsupportedType(_) => ErrorKind::UnsupportedType,
            RdbError::UnsupportedEncoding { .. } => ErrorKind::UnsupportedEncoding,
            RdbError::UnsupportedVersion { .. } => ErrorKind::UnsupportedVersion,
            RdbError::Io(_) => ErrorKind::Io,
        }
    }

    /// Returns whether this error is retryable. Decode errors never are.
    pub fn is_retryable(&self) -> bool {
        false
    }
}

/// Stable classification of [`RdbError`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The stream ended before a declared length was satisfied.
    UnexpectedEof,
    /// Internal length/structure inconsistency or checksum mismatch.
    CorruptedPayload,
    /// Well-formed but unrecognized object type.
    UnsupportedType,
    /// Well-formed but unrecognized encoding tag.
    UnsupportedEncoding,
    /// Payload version newer than this decoder understands.
    UnsupportedVersion,
    /// Transport failure other than end of stream.
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::UnexpectedEof => write!(f, "UNEXPECTED_EOF"),
            ErrorKind::CorruptedPayload => write!(f, "CORRUPTED_PAYLOAD"),
            ErrorKind::UnsupportedType => write!(f, "UNSUPPORTED_TYPE"),
            ErrorKind::UnsupportedEncoding => write!(f, "UNSUPPORTED_ENCODING"),
            ErrorKind::UnsupportedVersion => write!(f, "UNSUPPORTED_VERSION"),
            ErrorKind::Io => write!(f, "IO_ERROR"),
        }
    }
}

/// Result alias used across the rdbkit crates.
pub type Result<T, E = RdbError> = std::result::Result<T, E>;
