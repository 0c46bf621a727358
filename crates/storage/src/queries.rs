//! Query façade over the row table
//!
//! `RowQueries` is a thin view over a connection. Each method binds its
//! parameters into a statement from the connection's prepared-statement
//! cache, so every operation kind is compiled once per connection and
//! reused. Results are materialized before returning; no statement or row
//! cursor outlives the call.
//!
//! The statements execute inside whatever transaction is open on the
//! connection, which keeps this layer free of transaction state.

use digestkv_core::{Digest, Error, Result};
use rusqlite::{params, Connection, OptionalExtension};

/// Auto-incrementing row identifier
pub type RowId = i64;

const SELECT_BY_DIGEST: &str = "SELECT id, key FROM rows WHERE keyhash = ?1 ORDER BY id";
const SELECT_VALUE: &str = "SELECT value FROM rows WHERE id = ?1";
const INSERT_ROW: &str = "INSERT INTO rows (keyhash, key, value) VALUES (?1, ?2, ?3)";
const UPDATE_VALUE: &str = "UPDATE rows SET value = ?2 WHERE id = ?1";
const DELETE_ROW: &str = "DELETE FROM rows WHERE id = ?1";
const COUNT_ROWS: &str = "SELECT COUNT(*) FROM rows";
const SELECT_KEYS: &str = "SELECT key FROM rows ORDER BY keyhash, id LIMIT ?1 OFFSET ?2";

/// Parameterized statements over the row table
#[derive(Clone, Copy)]
pub struct RowQueries<'c> {
    conn: &'c Connection,
}

impl<'c> RowQueries<'c> {
    /// Bind the façade to a connection
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// All `(id, key bytes)` pairs stored under `digest`, in id order
    pub fn select_by_digest(&self, digest: &Digest) -> Result<Vec<(RowId, Vec<u8>)>> {
        let mut stmt = self.conn.prepare_cached(SELECT_BY_DIGEST)?;
        let rows = stmt.query_map(params![&digest[..]], |row| Ok((row.get(0)?, row.get(1)?)))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Value bytes of row `id`, or `None` if no such row exists
    pub fn select_value(&self, id: RowId) -> Result<Option<Vec<u8>>> {
        let mut stmt = self.conn.prepare_cached(SELECT_VALUE)?;
        Ok(stmt.query_row(params![id], |row| row.get(0)).optional()?)
    }

    /// Insert a row; returns the number of rows affected
    pub fn insert(&self, digest: &Digest, key: &[u8], value: &[u8]) -> Result<usize> {
        let mut stmt = self.conn.prepare_cached(INSERT_ROW)?;
        Ok(stmt.execute(params![&digest[..], key, value])?)
    }

    /// Overwrite the value bytes of row `id`; returns the number of rows affected
    pub fn update_value(&self, id: RowId, value: &[u8]) -> Result<usize> {
        let mut stmt = self.conn.prepare_cached(UPDATE_VALUE)?;
        Ok(stmt.execute(params![id, value])?)
    }

    /// Delete row `id`; returns the number of rows affected
    pub fn delete(&self, id: RowId) -> Result<usize> {
        let mut stmt = self.conn.prepare_cached(DELETE_ROW)?;
        Ok(stmt.execute(params![id])?)
    }

    /// Total number of rows
    pub fn count(&self) -> Result<u64> {
        let mut stmt = self.conn.prepare_cached(COUNT_ROWS)?;
        let n: i64 = stmt.query_row([], |row| row.get(0))?;
        u64::try_from(n).map_err(|_| Error::corruption(format!("negative row count {}", n)))
    }

    /// Key bytes ordered by `(keyhash, id)`, skipping `offset` rows
    ///
    /// A negative `limit` means no limit, as in SQLite.
    pub fn select_keys(&self, offset: i64, limit: i64) -> Result<Vec<Vec<u8>>> {
        let mut stmt = self.conn.prepare_cached(SELECT_KEYS)?;
        let rows = stmt.query_map(params![limit, offset], |row| row.get(0))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}
