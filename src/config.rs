//! Decoder configuration.
//!
//! Configuration is loaded in the following order (later overrides earlier):
//! 1. Default values
//! 2. YAML config file (if specified via RDBKIT_CONFIG)
//! 3. Environment variables

use rdbkit_codec::RDB_VERSION;
use rdbkit_core::DecodeOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Decoding behavior.
    pub decode: DecodeConfig,
}

impl Config {
    /// Loads configuration from file, then applies environment variable overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("RDBKIT_CONFIG") {
            config = Self::from_file(&path)?;
        }

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(path.to_path_buf(), e))?;
        let config: Config = serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from environment variables only.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    fn apply_env_overrides(&mut self) {
        self.decode.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Checks values serde cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let max = self.decode.max_version;
        if max == 0 || max > RDB_VERSION {
            return Err(ConfigError::ValidationError(format!(
                "decode.max_version must be between 1 and {RDB_VERSION}, got {max}"
            )));
        }
        Ok(())
    }

    /// Options for the decoders.
    pub fn decode_options(&self) -> DecodeOptions {
        DecodeOptions::new()
            .with_max_version(self.decode.max_version)
            .with_verify_checksum(self.decode.verify_checksum)
            .with_skip_modules(self.decode.skip_modules)
    }

    /// Saves configuration to a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = serde_yaml::to_string(self)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;
        std::fs::write(path, content).map_err(|e| ConfigError::IoError(path.to_path_buf(), e))?;
        Ok(())
    }
}

/// Decoding behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeConfig {
    /// Newest payload or file version accepted.
    pub max_version: u16,
    /// Verify DUMP footers and file trailers.
    pub verify_checksum: bool,
    /// Keep Module_2 values as opaque fields instead of rejecting them.
    pub skip_modules: bool,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            max_version: RDB_VERSION,
            verify_checksum: true,
            skip_modules: true,
        }
    }
}

impl DecodeConfig {
    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(version) = var("RDBKIT_MAX_VERSION") {
            if let Ok(v) = version.parse() {
                self.max_version = v;
            }
        }
        if let Some(verify) = var("RDBKIT_VERIFY_CHECKSUM") {
            self.verify_checksum = verify == "1" || verify.to_lowercase() == "true";
        }
        if let Some(skip) = var("RDBKIT_SKIP_MODULES") {
            self.skip_modules = skip == "1" || skip.to_lowercase() == "true";
        }
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(PathBuf, std::io::Error),
    ParseError(PathBuf, String),
    ValidationError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(path, e) => {
                write!(f, "failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::ValidationError(msg) => {
                write!(f, "configuration validation failed: {}", msg)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
