//! digestkv - Typed persistent key-value store on an embedded SQLite file
//!
//! Keys and values of any application type are stored in one SQLite file.
//! Each type supplies a [`TypeTraits`] implementation (serialization,
//! ordering and digest); [`SerdeTraits`] covers any serde type with `Ord`.
//!
//! # Quick Start
//!
//! ```ignore
//! use digestkv::{OpenPolicy, SerdeStore, WriteMode};
//!
//! let mut store = SerdeStore::<String, u64>::create_serde("counts.db", OpenPolicy::CREATE_OR_OPEN)?;
//!
//! store.set_value(WriteMode::ADD_OR_REPLACE, &"visits".to_string(), &1)?;
//! assert_eq!(store.try_get_value(&"visits".to_string())?, Some(1));
//!
//! // Several writes, applied atomically
//! store.transaction(|txn| {
//!     txn.delete_value(&"visits".to_string())?;
//!     txn.set_value(WriteMode::ADD, &"views".to_string(), &1)
//! })?;
//! ```
//!
//! # Architecture
//!
//! - `digestkv-core`: errors, type traits, policies, configuration
//! - `digestkv-storage`: SQL schema and the query façade
//! - `digestkv-engine`: key resolution, transaction coordination, the store
//!
//! This crate re-exports the public surface of the core and engine crates.

pub use digestkv_core::{
    Digest, Error, JournalMode, OpenPolicy, Result, SerdeTraits, StoreConfig, SyncMode,
    TypeTraits, WriteMode, CONFIG_FILE_NAME, DIGEST_LEN,
};
pub use digestkv_engine::{SerdeStore, Store, Transaction, TransactionMetrics, TxnId};
