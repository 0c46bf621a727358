//! Storage layer for digestkv
//!
//! This crate is the only place that speaks SQL. It provides:
//! - Connection opening with the configured pragmas
//! - Schema creation for the row table and its digest index
//! - `RowQueries`: one cached, parameterized statement per operation kind
//!
//! Nothing here knows about key types, write policies or transactions.
//! Statements run against whatever transaction is current on the
//! connection they are given.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod connection;
pub mod queries;
pub mod schema;

pub use connection::{open_connection, OpenMode};
pub use queries::{RowId, RowQueries};
