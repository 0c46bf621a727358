//! Keyed-storage engine for digestkv
//!
//! This crate turns the SQL row table into a typed map:
//! - Resolver: typed key to row id, via digest lookup plus exact comparison
//! - Coordinator: at most one engine transaction per store, implicit
//!   single-operation transactions when the caller has not opened one
//! - Store: the public map (`contains_key`, `try_get_value`, `set_value`,
//!   `delete_value`, `count`, `list_keys`, `begin_transaction`)
//!
//! A `Store` owns one engine connection and is meant for one caller at a
//! time. Concurrent stores on the same file are isolated by the engine.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod coordinator;
pub mod resolver;
pub mod store;
pub mod transaction;

pub use coordinator::{TransactionCoordinator, TransactionMetrics, TxnId};
pub use resolver::{EncodedKey, KeyResolver};
pub use store::{SerdeStore, Store};
pub use transaction::Transaction;
