//! Store: the typed, persistent map
//!
//! ## Design
//!
//! A `Store` owns one engine connection, one transaction coordinator and
//! the type traits for its keys and values. Rows live in a single table;
//! the key digest is an index accelerator and exact key comparison is what
//! identifies a row (see [`crate::resolver`]).
//!
//! ## Transactions
//!
//! `contains_key`, `try_get_value`, `set_value` and `delete_value` join the
//! open explicit transaction, or wrap themselves in an implicit one.
//! `count` and `list_keys` are direct reads: they see the open transaction
//! if there is one but never start their own.
//!
//! ## Disposal
//!
//! Closing (or dropping) a store releases its cached statements, then rolls
//! back a transaction left open, then closes the connection.
//!
//! # Example
//!
//! ```ignore
//! let mut store = SerdeStore::<(String, i32), (String, i32)>::create_serde(
//!     "/path/to/store.db",
//!     OpenPolicy::CREATE_OR_OPEN,
//! )?;
//!
//! store.set_value(WriteMode::ADD_OR_REPLACE, &("red".into(), 7), &("blue".into(), 3))?;
//! assert!(store.contains_key(&("red".into(), 7))?);
//! ```

use crate::coordinator::{TransactionCoordinator, TransactionMetrics, TxnId};
use crate::resolver::{EncodedKey, KeyResolver};
use crate::transaction::Transaction;
use digestkv_core::{Error, OpenPolicy, Result, SerdeTraits, StoreConfig, TypeTraits, WriteMode};
use digestkv_storage::{open_connection, schema, OpenMode, RowId, RowQueries};
use rusqlite::Connection;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Store using [`SerdeTraits`] for both keys and values
pub type SerdeStore<K, V> = Store<SerdeTraits<K>, SerdeTraits<V>>;

/// Persistent map from `KT::Item` to `VT::Item`
pub struct Store<KT: TypeTraits, VT: TypeTraits> {
    path: PathBuf,
    conn: Connection,
    coordinator: TransactionCoordinator,
    key_traits: KT,
    value_traits: VT,
    disposed: bool,
}

impl<KT: TypeTraits, VT: TypeTraits> Store<KT, VT> {
    /// Create or open the store file at `path` with the default config
    ///
    /// # Errors
    ///
    /// - `InvalidOperation` if the file exists and `policy` forbids opening,
    ///   or is missing and `policy` forbids creating
    /// - Engine errors from opening the file or creating the schema
    pub fn create<P: AsRef<Path>>(
        path: P,
        key_traits: KT,
        value_traits: VT,
        policy: OpenPolicy,
    ) -> Result<Self> {
        Self::create_with_config(path, key_traits, value_traits, policy, &StoreConfig::default())
    }

    /// Create or open the store file at `path`, applying `config`
    pub fn create_with_config<P: AsRef<Path>>(
        path: P,
        key_traits: KT,
        value_traits: VT,
        policy: OpenPolicy,
        config: &StoreConfig,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let conn = if path.exists() {
            if !policy.allows_open() {
                return Err(Error::invalid_operation(format!(
                    "store file '{}' already exists and the policy does not allow opening it",
                    path.display()
                )));
            }
            let conn = open_connection(&path, OpenMode::Existing, config)?;
            schema::verify(&conn)?;
            info!(target: "digestkv::store", path = %path.display(), "Store opened");
            conn
        } else {
            if !policy.allows_create() {
                return Err(Error::invalid_operation(format!(
                    "store file '{}' does not exist and the policy does not allow creating it",
                    path.display()
                )));
            }
            let conn = open_connection(&path, OpenMode::Create, config)?;
            schema::initialize(&conn)?;
            info!(target: "digestkv::store", path = %path.display(), "Store created");
            conn
        };

        Ok(Self {
            path,
            conn,
            coordinator: TransactionCoordinator::new(),
            key_traits,
            value_traits,
            disposed: false,
        })
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Key traits this store was created with
    pub fn key_traits(&self) -> &KT {
        &self.key_traits
    }

    /// Value traits this store was created with
    pub fn value_traits(&self) -> &VT {
        &self.value_traits
    }

    /// True while an explicit transaction is open
    pub fn in_transaction(&self) -> bool {
        self.coordinator.is_active()
    }

    /// Transaction counters for this store
    pub fn metrics(&self) -> TransactionMetrics {
        self.coordinator.metrics()
    }

    // ========== Map API ==========

    /// True iff a row holds `key`
    pub fn contains_key(&mut self, key: &KT::Item) -> Result<bool> {
        self.coordinator.run(&self.conn, |conn| {
            Ok(KeyResolver::new(conn, &self.key_traits)
                .resolve(key)?
                .is_some())
        })
    }

    /// Value stored under `key`, if any
    ///
    /// # Errors
    ///
    /// `Corruption` if the row found for `key` disappears before its value
    /// is read. That cannot happen inside one transaction and signals a
    /// broken isolation guarantee.
    pub fn try_get_value(&mut self, key: &KT::Item) -> Result<Option<VT::Item>> {
        self.coordinator.run(&self.conn, |conn| {
            let id = match KeyResolver::new(conn, &self.key_traits).resolve(key)? {
                Some(id) => id,
                None => return Ok(None),
            };
            read_resolved_value(&RowQueries::new(conn), &self.value_traits, id).map(Some)
        })
    }

    /// Store `value` under `key` as far as `mode` allows
    ///
    /// Returns `false` without touching the store when the key exists and
    /// `mode` does not allow replacing, or when it is missing and `mode`
    /// does not allow adding. Otherwise returns whether exactly one row
    /// was written.
    pub fn set_value(&mut self, mode: WriteMode, key: &KT::Item, value: &VT::Item) -> Result<bool> {
        let encoded = EncodedKey::encode(&self.key_traits, key)?;

        self.coordinator.run(&self.conn, |conn| {
            let queries = RowQueries::new(conn);
            let found = KeyResolver::new(conn, &self.key_traits).resolve_encoded(key, &encoded)?;

            match found {
                Some(id) if mode.allows_replace() => {
                    let bytes = self.value_traits.serialize(value)?;
                    Ok(queries.update_value(id, &bytes)? == 1)
                }
                None if mode.allows_add() => {
                    let bytes = self.value_traits.serialize(value)?;
                    Ok(queries.insert(&encoded.digest, &encoded.bytes, &bytes)? == 1)
                }
                _ => Ok(false),
            }
        })
    }

    /// Remove `key`; returns `false` if it was not present
    pub fn delete_value(&mut self, key: &KT::Item) -> Result<bool> {
        self.coordinator.run(&self.conn, |conn| {
            match KeyResolver::new(conn, &self.key_traits).resolve(key)? {
                Some(id) => Ok(RowQueries::new(conn).delete(id)? == 1),
                None => Ok(false),
            }
        })
    }

    /// Number of stored keys
    pub fn count(&self) -> Result<u64> {
        RowQueries::new(&self.conn).count()
    }

    /// Keys ordered by `(digest, id)`, skipping `skip` and returning at most `take`
    ///
    /// `take = None` returns every remaining key. The order is stable for a
    /// given set of rows but unrelated to the keys' own ordering.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `skip` or `take` exceeds `i64::MAX`; no query
    /// runs in that case.
    pub fn list_keys(&self, skip: usize, take: Option<usize>) -> Result<Vec<KT::Item>> {
        let offset = i64::try_from(skip)
            .map_err(|_| Error::invalid_argument(format!("skip {} is out of range", skip)))?;
        let limit = match take {
            Some(take) => i64::try_from(take)
                .map_err(|_| Error::invalid_argument(format!("take {} is out of range", take)))?,
            None => -1,
        };

        RowQueries::new(&self.conn)
            .select_keys(offset, limit)?
            .iter()
            .map(|bytes| self.key_traits.deserialize(bytes))
            .collect()
    }

    // ========== Transactions ==========

    /// Open an explicit transaction
    ///
    /// # Errors
    ///
    /// `InvalidOperation` if a transaction is already open.
    pub fn begin_transaction(&mut self) -> Result<Transaction<'_, KT, VT>> {
        let id = self.coordinator.begin(&self.conn)?;
        Ok(Transaction::new(self, id))
    }

    /// Run `f` in an explicit transaction
    ///
    /// Commits when `f` returns `Ok`, rolls back when it returns `Err`.
    ///
    /// # Example
    ///
    /// ```ignore
    /// store.transaction(|txn| {
    ///     txn.delete_value(&old)?;
    ///     txn.set_value(WriteMode::ADD, &new, &value)
    /// })?;
    /// ```
    pub fn transaction<F, T>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Transaction<'_, KT, VT>) -> Result<T>,
    {
        let mut txn = self.begin_transaction()?;

        match f(&mut txn) {
            Ok(value) => {
                txn.commit()?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rb) = txn.rollback() {
                    warn!(target: "digestkv::txn", error = %rb, "Rollback after closure error failed");
                }
                Err(e)
            }
        }
    }

    pub(crate) fn commit_transaction(&mut self, id: TxnId) -> Result<()> {
        self.coordinator.commit(&self.conn, id)
    }

    pub(crate) fn rollback_transaction(&mut self, id: TxnId) -> Result<()> {
        self.coordinator.rollback(&self.conn, id)
    }

    // ========== Disposal ==========

    /// Close the store, reporting errors that dropping would only log
    pub fn close(mut self) -> Result<()> {
        self.dispose()
    }

    fn dispose(&mut self) -> Result<()> {
        if self.disposed {
            return Ok(());
        }
        self.disposed = true;

        self.conn.flush_prepared_statement_cache();
        let rolled_back = self.coordinator.rollback_active(&self.conn)?;
        info!(
            target: "digestkv::store",
            path = %self.path.display(),
            rolled_back,
            "Store closed"
        );
        Ok(())
    }
}

/// Value of a row the resolver just found
///
/// A missing row here means it vanished between resolution and fetch.
fn read_resolved_value<VT: TypeTraits>(
    queries: &RowQueries<'_>,
    traits: &VT,
    id: RowId,
) -> Result<VT::Item> {
    match queries.select_value(id)? {
        Some(bytes) => traits.deserialize(&bytes),
        None => {
            error!(target: "digestkv::store", row_id = id, "Resolved row vanished before its value was read");
            Err(Error::corruption(format!(
                "row {} was resolved but vanished before its value was read",
                id
            )))
        }
    }
}

impl<K, V> Store<SerdeTraits<K>, SerdeTraits<V>>
where
    K: Serialize + DeserializeOwned + Ord,
    V: Serialize + DeserializeOwned + Ord,
{
    /// Create or open a store using [`SerdeTraits`] for keys and values
    pub fn create_serde<P: AsRef<Path>>(path: P, policy: OpenPolicy) -> Result<Self> {
        Self::create(path, SerdeTraits::new(), SerdeTraits::new(), policy)
    }
}

impl<KT: TypeTraits, VT: TypeTraits> Drop for Store<KT, VT> {
    fn drop(&mut self) {
        if let Err(e) = self.dispose() {
            warn!(target: "digestkv::store", path = %self.path.display(), error = %e, "Error while closing store");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    type TestStore = SerdeStore<String, i64>;

    fn setup() -> (TempDir, TestStore) {
        let temp_dir = TempDir::new().unwrap();
        let store = TestStore::create_serde(temp_dir.path().join("store.db"), OpenPolicy::CREATE)
            .unwrap();
        (temp_dir, store)
    }

    fn k(s: &str) -> String {
        s.to_string()
    }

    #[test]
    fn test_store_creation() {
        let (_temp, store) = setup();
        assert_eq!(store.count().unwrap(), 0);
        assert!(store.path().exists());
        assert!(!store.in_transaction());
    }

    #[test]
    fn test_set_and_get() {
        let (_temp, mut store) = setup();
        assert!(store.set_value(WriteMode::ADD, &k("a"), &1).unwrap());
        assert_eq!(store.try_get_value(&k("a")).unwrap(), Some(1));
        assert_eq!(store.try_get_value(&k("b")).unwrap(), None);
    }

    #[test]
    fn test_add_only_keeps_existing_value() {
        let (_temp, mut store) = setup();
        store.set_value(WriteMode::ADD, &k("a"), &1).unwrap();
        assert!(!store.set_value(WriteMode::ADD, &k("a"), &2).unwrap());
        assert_eq!(store.try_get_value(&k("a")).unwrap(), Some(1));
    }

    #[test]
    fn test_replace_only_skips_missing_key() {
        let (_temp, mut store) = setup();
        assert!(!store.set_value(WriteMode::REPLACE, &k("a"), &1).unwrap());
        assert_eq!(store.count().unwrap(), 0);

        store.set_value(WriteMode::ADD, &k("a"), &1).unwrap();
        assert!(store.set_value(WriteMode::REPLACE, &k("a"), &5).unwrap());
        assert_eq!(store.try_get_value(&k("a")).unwrap(), Some(5));
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_add_or_replace() {
        let (_temp, mut store) = setup();
        assert!(store.set_value(WriteMode::ADD_OR_REPLACE, &k("a"), &1).unwrap());
        assert!(store.set_value(WriteMode::ADD_OR_REPLACE, &k("a"), &2).unwrap());
        assert_eq!(store.try_get_value(&k("a")).unwrap(), Some(2));
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_delete_twice() {
        let (_temp, mut store) = setup();
        store.set_value(WriteMode::ADD, &k("a"), &1).unwrap();
        assert!(store.delete_value(&k("a")).unwrap());
        assert!(!store.delete_value(&k("a")).unwrap());
        assert!(!store.contains_key(&k("a")).unwrap());
    }

    #[test]
    fn test_operations_use_implicit_transactions() {
        let (_temp, mut store) = setup();
        store.set_value(WriteMode::ADD, &k("a"), &1).unwrap();
        store.contains_key(&k("a")).unwrap();
        store.count().unwrap();
        store.list_keys(0, None).unwrap();

        let metrics = store.metrics();
        assert_eq!(metrics.total_implicit, 2);
        assert_eq!(metrics.total_committed, 2);
        assert!(!metrics.active);
    }

    #[test]
    fn test_list_keys_rejects_out_of_range_arguments() {
        let (_temp, store) = setup();
        assert!(store.list_keys(usize::MAX, None).unwrap_err().is_invalid_argument());
        assert!(store.list_keys(0, Some(usize::MAX)).unwrap_err().is_invalid_argument());
    }

    #[test]
    fn test_vanished_row_is_corruption() {
        let (_temp, mut store) = setup();
        store.set_value(WriteMode::ADD, &k("a"), &1).unwrap();
        let id = KeyResolver::new(&store.conn, &store.key_traits)
            .resolve(&k("a"))
            .unwrap()
            .unwrap();

        let queries = RowQueries::new(&store.conn);
        assert_eq!(read_resolved_value(&queries, &store.value_traits, id).unwrap(), 1);

        queries.delete(id).unwrap();
        let err = read_resolved_value(&queries, &store.value_traits, id).unwrap_err();
        assert!(err.is_corruption());
    }

    #[test]
    fn test_close_reports_success() {
        let (_temp, mut store) = setup();
        store.set_value(WriteMode::ADD, &k("a"), &1).unwrap();
        store.close().unwrap();
    }
}
