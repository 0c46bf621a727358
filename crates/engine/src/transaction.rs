//! Explicit transaction handle
//!
//! A `Transaction` mutably borrows its store, so the store cannot be used
//! around it or closed underneath it. It dereferences to the store: every
//! store operation called through the handle joins the open transaction
//! instead of opening an implicit one.
//!
//! Dropping the handle without `commit` rolls the transaction back.

use crate::coordinator::TxnId;
use crate::store::Store;
use digestkv_core::{Result, TypeTraits};
use std::ops::{Deref, DerefMut};
use tracing::{debug, warn};

/// Open transaction on a [`Store`]
pub struct Transaction<'s, KT: TypeTraits, VT: TypeTraits> {
    store: &'s mut Store<KT, VT>,
    id: TxnId,
    finished: bool,
}

impl<'s, KT: TypeTraits, VT: TypeTraits> Transaction<'s, KT, VT> {
    pub(crate) fn new(store: &'s mut Store<KT, VT>, id: TxnId) -> Self {
        Self {
            store,
            id,
            finished: false,
        }
    }

    /// Coordinator id of this transaction
    pub fn id(&self) -> TxnId {
        self.id
    }

    /// Make every operation performed through this handle durable
    ///
    /// # Errors
    ///
    /// Engine errors from `COMMIT`. The transaction is rolled back in that
    /// case and the store is left without an open transaction.
    pub fn commit(mut self) -> Result<()> {
        self.finished = true;
        self.store.commit_transaction(self.id)
    }

    /// Discard every operation performed through this handle
    ///
    /// Same as dropping the handle, but reports engine errors.
    pub fn rollback(mut self) -> Result<()> {
        self.finished = true;
        self.store.rollback_transaction(self.id)
    }
}

impl<KT: TypeTraits, VT: TypeTraits> Deref for Transaction<'_, KT, VT> {
    type Target = Store<KT, VT>;

    fn deref(&self) -> &Store<KT, VT> {
        self.store
    }
}

impl<KT: TypeTraits, VT: TypeTraits> DerefMut for Transaction<'_, KT, VT> {
    fn deref_mut(&mut self) -> &mut Store<KT, VT> {
        self.store
    }
}

impl<KT: TypeTraits, VT: TypeTraits> Drop for Transaction<'_, KT, VT> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        debug!(target: "digestkv::txn", txn_id = self.id, "Transaction dropped without commit, rolling back");
        if let Err(e) = self.store.rollback_transaction(self.id) {
            warn!(target: "digestkv::txn", txn_id = self.id, error = %e, "Rollback on drop failed");
        }
    }
}
