//! Core types and traits for digestkv
//!
//! This crate defines the foundational pieces shared by every layer:
//! - Error: Error type and `Result` alias
//! - Traits: The per-type collaborator contract (`TypeTraits`) and the
//!   default serde/bincode/SHA-256 implementation
//! - Policy: Create/open and add/replace permission sets
//! - Config: `StoreConfig`, loadable from TOML

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod policy;
pub mod traits;

pub use config::{JournalMode, StoreConfig, SyncMode, CONFIG_FILE_NAME};
pub use error::{Error, Result};
pub use policy::{OpenPolicy, WriteMode};
pub use traits::{Digest, SerdeTraits, TypeTraits, DIGEST_LEN};
