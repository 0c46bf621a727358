//! Store configuration via `digestkv.toml`
//!
//! Every field has a default, so an empty file (or no file at all) gives a
//! working configuration. The settings are applied to the engine
//! connection when a store is created or opened.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Conventional config file name, placed next to the store file.
pub const CONFIG_FILE_NAME: &str = "digestkv.toml";

/// SQLite journal mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum JournalMode {
    /// Rollback journal, deleted at the end of each transaction
    #[default]
    Delete,
    /// Write-ahead log
    Wal,
}

impl JournalMode {
    /// Value for `PRAGMA journal_mode`
    pub fn as_pragma(&self) -> &'static str {
        match self {
            JournalMode::Delete => "DELETE",
            JournalMode::Wal => "WAL",
        }
    }
}

/// SQLite synchronous setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    /// fsync at every critical moment
    #[default]
    Full,
    /// fewer fsyncs; safe with WAL, may lose the last commit on power loss otherwise
    Normal,
}

impl SyncMode {
    /// Value for `PRAGMA synchronous`
    pub fn as_pragma(&self) -> &'static str {
        match self {
            SyncMode::Full => "FULL",
            SyncMode::Normal => "NORMAL",
        }
    }
}

/// Store configuration loaded from `digestkv.toml`.
///
/// # Example
///
/// ```toml
/// busy_timeout_ms = 5000
/// journal_mode = "wal"
/// synchronous = "normal"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// How long a connection waits on a locked file before the engine
    /// reports a busy error.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// Journal mode applied on every open.
    #[serde(default)]
    pub journal_mode: JournalMode,
    /// Synchronous mode applied on every open.
    #[serde(default)]
    pub synchronous: SyncMode,
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            busy_timeout_ms: default_busy_timeout_ms(),
            journal_mode: JournalMode::default(),
            synchronous: SyncMode::default(),
        }
    }
}

impl StoreConfig {
    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# digestkv store configuration
#
# Milliseconds to wait on a locked store file before failing (default: 5000)
busy_timeout_ms = 5000

# Journal mode: "delete" (default) or "wal"
journal_mode = "delete"

# Synchronous mode: "full" (default) or "normal"
synchronous = "full"
"#
    }

    /// Parse config from TOML text.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the text is not valid TOML or a field has
    /// an unknown value.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        toml::from_str(&content).map_err(|e| {
            Error::Config(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })
    }

    /// Write the default config file if it does not already exist.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml())?;
        }
        Ok(())
    }

    /// Busy timeout as a `Duration`
    pub fn busy_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.busy_timeout_ms)
    }
}
