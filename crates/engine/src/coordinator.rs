//! Transaction coordinator for a single store
//!
//! Two states: no transaction, or exactly one open engine transaction.
//!
//! - `begin` moves to the open state (`BEGIN IMMEDIATE`, serializable in SQLite)
//! - `commit` and `rollback` move back; both require the id handed out by
//!   `begin`, so a stale or foreign handle cannot end someone else's transaction
//! - `run` executes an operation inside the open transaction if there is
//!   one, otherwise inside an implicit begin/commit pair
//!
//! Misuse (nested begin, ending a transaction that is not open) is an
//! `InvalidOperation` error. Engine failures are returned unchanged and
//! never retried.

use digestkv_core::{Error, Result};
use rusqlite::Connection;
use tracing::{debug, warn};

/// Identifier of an explicit or implicit transaction, unique per store
pub type TxnId = u64;

/// Tracks the open transaction of one store, plus lifecycle counters
#[derive(Debug, Default)]
pub struct TransactionCoordinator {
    /// Open transaction, if any
    active: Option<TxnId>,
    /// Next id to hand out
    next_id: TxnId,
    started: u64,
    committed: u64,
    rolled_back: u64,
    implicit: u64,
}

impl TransactionCoordinator {
    /// Coordinator with no open transaction
    pub fn new() -> Self {
        Self::default()
    }

    /// True while a transaction is open
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Id of the open transaction
    pub fn active_id(&self) -> Option<TxnId> {
        self.active
    }

    /// Open an engine transaction
    ///
    /// # Errors
    ///
    /// `InvalidOperation` if a transaction is already open; nested
    /// transactions are not supported.
    pub fn begin(&mut self, conn: &Connection) -> Result<TxnId> {
        if let Some(open) = self.active {
            return Err(Error::invalid_operation(format!(
                "transaction {} is already active; nested transactions are not supported",
                open
            )));
        }

        conn.execute_batch("BEGIN IMMEDIATE")?;

        let id = self.next_id;
        self.next_id += 1;
        self.active = Some(id);
        self.started += 1;

        debug!(target: "digestkv::txn", txn_id = id, "Transaction started");
        Ok(id)
    }

    /// Commit transaction `id`
    ///
    /// If the engine refuses the commit, the transaction is rolled back and
    /// the engine error returned; the coordinator is idle either way.
    ///
    /// # Errors
    ///
    /// `InvalidOperation` if `id` is not the open transaction.
    pub fn commit(&mut self, conn: &Connection, id: TxnId) -> Result<()> {
        self.finish(id, "commit")?;

        match conn.execute_batch("COMMIT") {
            Ok(()) => {
                self.committed += 1;
                debug!(target: "digestkv::txn", txn_id = id, "Transaction committed");
                Ok(())
            }
            Err(e) => {
                warn!(target: "digestkv::txn", txn_id = id, error = %e, "Commit failed, rolling back");
                if !conn.is_autocommit() {
                    if let Err(rb) = conn.execute_batch("ROLLBACK") {
                        warn!(target: "digestkv::txn", txn_id = id, error = %rb, "Rollback after failed commit failed");
                    }
                }
                self.rolled_back += 1;
                Err(e.into())
            }
        }
    }

    /// Roll back transaction `id`
    ///
    /// # Errors
    ///
    /// `InvalidOperation` if `id` is not the open transaction.
    pub fn rollback(&mut self, conn: &Connection, id: TxnId) -> Result<()> {
        self.finish(id, "roll back")?;
        self.rolled_back += 1;

        // The engine may already have rolled back on its own (for example
        // after SQLITE_FULL); ROLLBACK would then fail with "no transaction".
        if !conn.is_autocommit() {
            conn.execute_batch("ROLLBACK")?;
        }
        debug!(target: "digestkv::txn", txn_id = id, "Transaction rolled back");
        Ok(())
    }

    /// Roll back whatever transaction is open; returns whether there was one
    pub fn rollback_active(&mut self, conn: &Connection) -> Result<bool> {
        match self.active {
            Some(id) => {
                self.rollback(conn, id)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Run `op` inside the open transaction, or inside an implicit one
    ///
    /// The implicit transaction commits when `op` returns `Ok` and rolls
    /// back when it returns `Err`. The operation's error wins over a
    /// rollback failure, which is only logged.
    pub fn run<T, F>(&mut self, conn: &Connection, op: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        if self.active.is_some() {
            return op(conn);
        }

        let id = self.begin(conn)?;
        self.implicit += 1;

        match op(conn) {
            Ok(value) => {
                self.commit(conn, id)?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rb) = self.rollback(conn, id) {
                    warn!(target: "digestkv::txn", txn_id = id, error = %rb, "Implicit rollback failed");
                }
                Err(e)
            }
        }
    }

    /// Get transaction metrics
    ///
    /// Returns current snapshot of transaction statistics.
    pub fn metrics(&self) -> TransactionMetrics {
        TransactionMetrics {
            active: self.active.is_some(),
            total_started: self.started,
            total_committed: self.committed,
            total_rolled_back: self.rolled_back,
            total_implicit: self.implicit,
        }
    }

    fn finish(&mut self, id: TxnId, action: &str) -> Result<()> {
        match self.active {
            Some(open) if open == id => {
                self.active = None;
                Ok(())
            }
            Some(open) => Err(Error::invalid_operation(format!(
                "cannot {} transaction {}: transaction {} is the active one",
                action, id, open
            ))),
            None => Err(Error::invalid_operation(format!(
                "cannot {} transaction {}: no transaction is active",
                action, id
            ))),
        }
    }
}

/// Transaction metrics
///
/// Provides statistics about transaction lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionMetrics {
    /// Whether a transaction is currently open
    pub active: bool,
    /// Total transactions started (explicit and implicit)
    pub total_started: u64,
    /// Total transactions committed
    pub total_committed: u64,
    /// Total transactions rolled back
    pub total_rolled_back: u64,
    /// Transactions opened implicitly around a single operation
    pub total_implicit: u64,
}

impl TransactionMetrics {
    /// Total transactions that completed (committed + rolled back)
    pub fn total_completed(&self) -> u64 {
        self.total_committed + self.total_rolled_back
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (x INTEGER);").unwrap();
        conn
    }

    fn count(conn: &Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM t", [], |r| r.get(0))
            .unwrap()
    }

    #[test]
    fn test_coordinator_new() {
        let coordinator = TransactionCoordinator::new();
        assert!(!coordinator.is_active());

        let metrics = coordinator.metrics();
        assert!(!metrics.active);
        assert_eq!(metrics.total_started, 0);
        assert_eq!(metrics.total_committed, 0);
        assert_eq!(metrics.total_rolled_back, 0);
    }

    #[test]
    fn test_begin_commit() {
        let conn = create_conn();
        let mut coordinator = TransactionCoordinator::new();

        let id = coordinator.begin(&conn).unwrap();
        assert!(coordinator.is_active());
        assert_eq!(coordinator.active_id(), Some(id));
        conn.execute("INSERT INTO t VALUES (1)", []).unwrap();
        coordinator.commit(&conn, id).unwrap();

        assert!(!coordinator.is_active());
        assert!(conn.is_autocommit());
        assert_eq!(count(&conn), 1);
        assert_eq!(coordinator.metrics().total_committed, 1);
    }

    #[test]
    fn test_begin_rollback_discards_writes() {
        let conn = create_conn();
        let mut coordinator = TransactionCoordinator::new();

        let id = coordinator.begin(&conn).unwrap();
        conn.execute("INSERT INTO t VALUES (1)", []).unwrap();
        coordinator.rollback(&conn, id).unwrap();

        assert_eq!(count(&conn), 0);
        assert_eq!(coordinator.metrics().total_rolled_back, 1);
    }

    #[test]
    fn test_nested_begin_rejected() {
        let conn = create_conn();
        let mut coordinator = TransactionCoordinator::new();

        let id = coordinator.begin(&conn).unwrap();
        let err = coordinator.begin(&conn).unwrap_err();
        assert!(err.is_invalid_operation());

        // The original transaction is untouched
        assert_eq!(coordinator.active_id(), Some(id));
        coordinator.commit(&conn, id).unwrap();
    }

    #[test]
    fn test_commit_without_transaction_rejected() {
        let conn = create_conn();
        let mut coordinator = TransactionCoordinator::new();
        assert!(coordinator.commit(&conn, 0).unwrap_err().is_invalid_operation());
        assert!(coordinator.rollback(&conn, 0).unwrap_err().is_invalid_operation());
    }

    #[test]
    fn test_double_commit_rejected() {
        let conn = create_conn();
        let mut coordinator = TransactionCoordinator::new();
        let id = coordinator.begin(&conn).unwrap();
        coordinator.commit(&conn, id).unwrap();
        assert!(coordinator.commit(&conn, id).unwrap_err().is_invalid_operation());
        assert!(coordinator.rollback(&conn, id).unwrap_err().is_invalid_operation());
    }

    #[test]
    fn test_stale_id_rejected() {
        let conn = create_conn();
        let mut coordinator = TransactionCoordinator::new();
        let first = coordinator.begin(&conn).unwrap();
        coordinator.commit(&conn, first).unwrap();
        let second = coordinator.begin(&conn).unwrap();
        assert_ne!(first, second);

        assert!(coordinator.commit(&conn, first).unwrap_err().is_invalid_operation());
        assert_eq!(coordinator.active_id(), Some(second));
        coordinator.rollback(&conn, second).unwrap();
    }

    #[test]
    fn test_run_wraps_in_implicit_transaction() {
        let conn = create_conn();
        let mut coordinator = TransactionCoordinator::new();

        let seen_open = coordinator
            .run(&conn, |c| {
                c.execute("INSERT INTO t VALUES (1)", [])?;
                Ok(!c.is_autocommit())
            })
            .unwrap();

        assert!(seen_open);
        assert!(!coordinator.is_active());
        assert_eq!(count(&conn), 1);
        let metrics = coordinator.metrics();
        assert_eq!(metrics.total_implicit, 1);
        assert_eq!(metrics.total_committed, 1);
    }

    #[test]
    fn test_run_rolls_back_on_error() {
        let conn = create_conn();
        let mut coordinator = TransactionCoordinator::new();

        let result: Result<()> = coordinator.run(&conn, |c| {
            c.execute("INSERT INTO t VALUES (1)", [])?;
            Err(Error::invalid_argument("boom"))
        });

        assert!(result.unwrap_err().is_invalid_argument());
        assert!(!coordinator.is_active());
        assert_eq!(count(&conn), 0);
        assert_eq!(coordinator.metrics().total_rolled_back, 1);
    }

    #[test]
    fn test_run_inside_explicit_transaction_does_not_commit() {
        let conn = create_conn();
        let mut coordinator = TransactionCoordinator::new();

        let id = coordinator.begin(&conn).unwrap();
        coordinator
            .run(&conn, |c| {
                c.execute("INSERT INTO t VALUES (1)", [])?;
                Ok(())
            })
            .unwrap();
        assert_eq!(coordinator.active_id(), Some(id));
        assert_eq!(coordinator.metrics().total_implicit, 0);

        coordinator.rollback(&conn, id).unwrap();
        assert_eq!(count(&conn), 0);
    }

    #[test]
    fn test_rollback_active() {
        let conn = create_conn();
        let mut coordinator = TransactionCoordinator::new();
        assert!(!coordinator.rollback_active(&conn).unwrap());

        coordinator.begin(&conn).unwrap();
        assert!(coordinator.rollback_active(&conn).unwrap());
        assert!(!coordinator.is_active());
    }

    #[test]
    fn test_metrics_helpers() {
        let conn = create_conn();
        let mut coordinator = TransactionCoordinator::new();
        let a = coordinator.begin(&conn).unwrap();
        coordinator.commit(&conn, a).unwrap();
        let b = coordinator.begin(&conn).unwrap();
        coordinator.rollback(&conn, b).unwrap();

        let metrics = coordinator.metrics();
        assert_eq!(metrics.total_started, 2);
        assert_eq!(metrics.total_completed(), 2);
    }
}
