//! Decode options.

use rdbkit_codec::RDB_VERSION;

/// Knobs shared by payload, object and file decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Newest payload or file version accepted.
    pub max_version: u16,
    /// Verify DUMP footers and file trailers.
    pub verify_checksum: bool,
    /// Walk Module_2 values into opaque [`ModuleValue`](crate::ModuleValue)s
    /// instead of failing with `UnsupportedType`.
    pub skip_modules: bool,
}

impl DecodeOptions {
    pub fn new() -> Self {
        Self {
            max_version: RDB_VERSION,
            verify_checksum: true,
            skip_modules: true,
        }
    }

    pub fn with_max_version(mut self, version: u16) -> Self {
        self.max_version = version;
        self
    }

    pub fn with_verify_checksum(mut self, verify: bool) -> Self {
        self.verify_checksum = verify;
        self
    }

    pub fn with_skip_modules(mut self, skip: bool) -> Self {
        self.skip_modules = skip;
        self
    }
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = DecodeOptions::default();
        assert_eq!(opts.max_version, 11);
        assert!(opts.verify_checksum);
        assert!(opts.skip_modules);
    }

    #[test]
    fn test_builder() {
        let opts = DecodeOptions::new()
            .with_max_version(9)
            .with_verify_checksum(false)
            .with_skip_modules(false);
        assert_eq!(opts.max_version, 9);
        assert!(!opts.verify_checksum);
        assert!(!opts.skip_modules);
    }
}
