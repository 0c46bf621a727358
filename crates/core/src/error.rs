//! Error types for digestkv
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! Engine failures (constraint violations, I/O inside SQLite, lock
//! conflicts) are carried unchanged in [`Error::Sqlite`]. Nothing in the
//! store retries them.

use std::io;
use thiserror::Error;

/// Result type alias for digestkv operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for digestkv
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error (file operations)
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    /// Error reported by the embedded SQLite engine
    #[error("Engine error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Invalid operation or state
    ///
    /// Raised for policy violations at create/open time and for
    /// transactional misuse (nested begin, commit without a transaction).
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Argument rejected before any engine call
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Internal inconsistency detected (a resolved row vanished)
    #[error("Data corruption: {0}")]
    Corruption(String),

    /// Configuration could not be read or parsed
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Build an `InvalidOperation` error
    pub fn invalid_operation(msg: impl Into<String>) -> Self {
        Error::InvalidOperation(msg.into())
    }

    /// Build an `InvalidArgument` error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    /// Build a `Corruption` error
    pub fn corruption(msg: impl Into<String>) -> Self {
        Error::Corruption(msg.into())
    }

    /// True for `InvalidOperation`
    pub fn is_invalid_operation(&self) -> bool {
        matches!(self, Error::InvalidOperation(_))
    }

    /// True for `InvalidArgument`
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Error::InvalidArgument(_))
    }

    /// True for `Corruption`
    pub fn is_corruption(&self) -> bool {
        matches!(self, Error::Corruption(_))
    }
}

impl From<bincode::Error> for Error {
    fn from(e: bincode::Error) -> Self {
        Error::SerializationError(e.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}
