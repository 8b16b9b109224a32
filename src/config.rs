//! Store configuration
//!
//! Policies are carried per store instance, so differently configured stores
//! can live side by side in one process.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Invalid locator
    #[error("Invalid locator: {0}")]
    InvalidLocator(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Durability backend selection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendConfig {
    /// Ordered in-memory maps, lost on close
    #[default]
    Memory,
    /// RocksDB database directory
    RocksDb { path: PathBuf },
}

impl BackendConfig {
    /// Parse a locator string.
    ///
    /// `memory:` and `mem:` select the in-memory backend, `rocksdb:<path>`
    /// or a bare path selects RocksDB.
    pub fn from_locator(locator: &str) -> ConfigResult<Self> {
        let locator = locator.trim();
        match locator {
            "" => Err(ConfigError::InvalidLocator("empty locator".to_string())),
            "memory:" | "mem:" => Ok(BackendConfig::Memory),
            _ => {
                let path = locator.strip_prefix("rocksdb:").unwrap_or(locator);
                if path.is_empty() {
                    return Err(ConfigError::InvalidLocator(locator.to_string()));
                }
                Ok(BackendConfig::RocksDb {
                    path: PathBuf::from(path),
                })
            }
        }
    }
}

/// Quad store configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Absorb references to absent quads and nodes instead of failing
    pub ignore_missing: bool,
    /// Treat re-adding an existing quad as a no-op instead of failing
    pub ignore_duplicates: bool,
    /// Durability backend
    pub backend: BackendConfig,
}

impl StoreConfig {
    /// In-memory store with both policies off
    pub fn memory() -> Self {
        Self::default()
    }

    /// Store at the given locator with both policies off
    pub fn from_locator(locator: &str) -> ConfigResult<Self> {
        Ok(Self {
            backend: BackendConfig::from_locator(locator)?,
            ..Self::default()
        })
    }

    pub fn with_ignore_missing(mut self, ignore: bool) -> Self {
        self.ignore_missing = ignore;
        self
    }

    pub fn with_ignore_duplicates(mut self, ignore: bool) -> Self {
        self.ignore_duplicates = ignore;
        self
    }

    /// Both policies on, as the demo programs run
    pub fn lenient(self) -> Self {
        self.with_ignore_missing(true).with_ignore_duplicates(true)
    }

    /// Parse configuration from YAML
    pub fn from_yaml_str(yaml: &str) -> ConfigResult<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }
}
