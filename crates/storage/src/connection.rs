//! Opening engine connections
//!
//! The caller decides whether the file should be created or must already
//! exist; this module maps that onto SQLite open flags and applies the
//! pragmas from [`StoreConfig`].

use digestkv_core::{Result, StoreConfig};
use rusqlite::{Connection, OpenFlags};
use std::path::Path;
use tracing::debug;

/// How the backing file is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Create the file if missing
    Create,
    /// The file must exist; opening fails if it was removed in the meantime
    Existing,
}

impl OpenMode {
    fn flags(self) -> OpenFlags {
        let base = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        match self {
            OpenMode::Create => base | OpenFlags::SQLITE_OPEN_CREATE,
            OpenMode::Existing => base,
        }
    }
}

/// Open a connection to `path` and apply `config`
///
/// # Errors
///
/// Engine errors are returned unchanged, including "unable to open" when
/// `mode` is `Existing` and the file is gone.
pub fn open_connection(path: &Path, mode: OpenMode, config: &StoreConfig) -> Result<Connection> {
    let conn = Connection::open_with_flags(path, mode.flags())?;

    conn.busy_timeout(config.busy_timeout())?;
    let journal: String = conn.pragma_update_and_check(
        None,
        "journal_mode",
        config.journal_mode.as_pragma(),
        |row| row.get(0),
    )?;
    conn.pragma_update(None, "synchronous", config.synchronous.as_pragma())?;

    debug!(
        target: "digestkv::storage",
        path = %path.display(),
        ?mode,
        journal = %journal,
        "Connection opened"
    );
    Ok(conn)
}
