//! Persisted layout: one row table plus a non-unique index on the digest
//!
//! No versioning or migration. A newly created store always gets this layout.

use digestkv_core::{Error, Result};
use rusqlite::{Connection, OptionalExtension};
use tracing::debug;

/// Name of the row table
pub const ROW_TABLE: &str = "rows";

/// Name of the digest index
pub const DIGEST_INDEX: &str = "rows_keyhash_idx";

const CREATE_SCHEMA: &str = "BEGIN;
CREATE TABLE IF NOT EXISTS rows (
    id      INTEGER PRIMARY KEY AUTOINCREMENT,
    keyhash BLOB NOT NULL,
    key     BLOB NOT NULL,
    value   BLOB NOT NULL
);
CREATE INDEX IF NOT EXISTS rows_keyhash_idx ON rows (keyhash);
COMMIT;";

/// Create the row table and digest index in a fresh file
///
/// Runs as a single engine transaction, so a crash leaves either both
/// objects or neither.
pub fn initialize(conn: &Connection) -> Result<()> {
    conn.execute_batch(CREATE_SCHEMA)?;
    debug!(target: "digestkv::storage", table = ROW_TABLE, index = DIGEST_INDEX, "Schema created");
    Ok(())
}

/// Check that an opened file carries the row table
///
/// # Errors
///
/// Returns `InvalidOperation` if the file is a valid SQLite database but
/// was not created as a store.
pub fn verify(conn: &Connection) -> Result<()> {
    let found: Option<String> = conn
        .query_row(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [ROW_TABLE],
            |row| row.get(0),
        )
        .optional()?;

    match found {
        Some(_) => Ok(()),
        None => Err(Error::invalid_operation(format!(
            "file has no '{}' table; it was not created as a store",
            ROW_TABLE
        ))),
    }
}
