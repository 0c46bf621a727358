//! Key resolution: typed key to row id
//!
//! The digest narrows the search to the rows indexed under the same hash.
//! Each candidate's stored key is decoded and compared with the requested
//! key; only `Ordering::Equal` counts as a match. Digest collisions between
//! different keys are therefore harmless, they only add candidates.

use digestkv_core::{Digest, Result, TypeTraits};
use digestkv_storage::{RowId, RowQueries};
use rusqlite::Connection;
use std::cmp::Ordering;

/// A key in stored form: its encoding and the digest of that encoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedKey {
    /// Serialized key bytes
    pub bytes: Vec<u8>,
    /// Digest of `bytes`
    pub digest: Digest,
}

impl EncodedKey {
    /// Serialize `key` and digest the result
    pub fn encode<KT: TypeTraits>(traits: &KT, key: &KT::Item) -> Result<Self> {
        let bytes = traits.serialize(key)?;
        let digest = traits.digest(&bytes);
        Ok(Self { bytes, digest })
    }
}

/// Maps typed keys to row ids on one connection
pub struct KeyResolver<'a, KT> {
    queries: RowQueries<'a>,
    traits: &'a KT,
}

impl<'a, KT: TypeTraits> KeyResolver<'a, KT> {
    /// Resolver over `conn` using `traits` for keys
    pub fn new(conn: &'a Connection, traits: &'a KT) -> Self {
        Self {
            queries: RowQueries::new(conn),
            traits,
        }
    }

    /// Row id holding `key`, if any
    pub fn resolve(&self, key: &KT::Item) -> Result<Option<RowId>> {
        let encoded = EncodedKey::encode(self.traits, key)?;
        self.resolve_encoded(key, &encoded)
    }

    /// Like [`KeyResolver::resolve`] for a key the caller already encoded
    pub fn resolve_encoded(&self, key: &KT::Item, encoded: &EncodedKey) -> Result<Option<RowId>> {
        for (id, stored) in self.queries.select_by_digest(&encoded.digest)? {
            let candidate = self.traits.deserialize(&stored)?;
            if self.traits.compare(&candidate, key) == Ordering::Equal {
                return Ok(Some(id));
            }
        }
        Ok(None)
    }
}
