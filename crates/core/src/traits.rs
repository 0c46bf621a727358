//! Per-type collaborator contract
//!
//! A store is parameterized by one `TypeTraits` implementation for its keys
//! and one for its values. The store never inspects keys or values itself;
//! it only moves the bytes these traits produce.
//!
//! ## Contract
//!
//! - `deserialize(serialize(x))` compares `Equal` to `x`
//! - `digest` is deterministic: the same encoding always yields the same digest
//! - `compare` is a total order, and `Equal` is what "same key" means
//!
//! Digests are allowed to collide. The store resolves collisions by
//! comparing decoded keys, so a weak digest costs speed, never correctness.

use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest as _, Sha256};
use std::cmp::Ordering;
use std::fmt;
use std::marker::PhantomData;

/// Width in bytes of every key digest
pub const DIGEST_LEN: usize = 32;

/// Fixed-width digest of a serialized key
pub type Digest = [u8; DIGEST_LEN];

/// Serialization, ordering and hashing for one stored type
pub trait TypeTraits {
    /// The type these traits describe
    type Item;

    /// Encode `item` to its canonical byte form
    ///
    /// # Errors
    ///
    /// Returns an error if the item cannot be encoded.
    fn serialize(&self, item: &Self::Item) -> Result<Vec<u8>>;

    /// Decode bytes produced by [`TypeTraits::serialize`]
    ///
    /// # Errors
    ///
    /// Returns an error if `bytes` is not a valid encoding.
    fn deserialize(&self, bytes: &[u8]) -> Result<Self::Item>;

    /// Total order over items; `Equal` identifies the same logical key
    fn compare(&self, a: &Self::Item, b: &Self::Item) -> Ordering;

    /// Digest of an item's canonical encoding
    fn digest(&self, encoded: &[u8]) -> Digest;
}

/// Default traits for any serde type with a total order
///
/// Encodes with `bincode`, orders with `Ord`, and digests with SHA-256.
/// Types whose serde encoding is not canonical (hash maps with unstable
/// iteration order, for example) must not be used as keys.
pub struct SerdeTraits<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> SerdeTraits<T> {
    /// Create the traits value
    pub const fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for SerdeTraits<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for SerdeTraits<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> Copy for SerdeTraits<T> {}

impl<T> fmt::Debug for SerdeTraits<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerdeTraits")
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T> TypeTraits for SerdeTraits<T>
where
    T: Serialize + DeserializeOwned + Ord,
{
    type Item = T;

    fn serialize(&self, item: &T) -> Result<Vec<u8>> {
        Ok(bincode::serialize(item)?)
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<T> {
        Ok(bincode::deserialize(bytes)?)
    }

    fn compare(&self, a: &T, b: &T) -> Ordering {
        a.cmp(b)
    }

    fn digest(&self, encoded: &[u8]) -> Digest {
        Sha256::digest(encoded).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_serde_traits_round_trip_tuple() {
        let traits = SerdeTraits::<(String, i32)>::new();
        let key = ("red".to_string(), 7);
        let bytes = traits.serialize(&key).unwrap();
        let decoded = traits.deserialize(&bytes).unwrap();
        assert_eq!(traits.compare(&key, &decoded), Ordering::Equal);
    }

    #[test]
    fn test_digest_is_deterministic_and_fixed_width() {
        let traits = SerdeTraits::<String>::new();
        let a = traits.serialize(&"alpha".to_string()).unwrap();
        let b = traits.serialize(&"beta".to_string()).unwrap();
        assert_eq!(traits.digest(&a), traits.digest(&a));
        assert_ne!(traits.digest(&a), traits.digest(&b));
        assert_eq!(traits.digest(&a).len(), DIGEST_LEN);
    }

    #[test]
    fn test_compare_follows_ord() {
        let traits = SerdeTraits::<i64>::new();
        assert_eq!(traits.compare(&1, &2), Ordering::Less);
        assert_eq!(traits.compare(&2, &2), Ordering::Equal);
        assert_eq!(traits.compare(&3, &2), Ordering::Greater);
    }

    #[test]
    fn test_deserialize_garbage_fails() {
        let traits = SerdeTraits::<String>::new();
        let err = traits.deserialize(&[0xFF; 8]).unwrap_err();
        assert!(matches!(err, crate::Error::SerializationError(_)));
    }

    proptest! {
        #[test]
        fn prop_round_trip_preserves_equality(s in ".*", n in any::<i64>()) {
            let traits = SerdeTraits::<(String, i64)>::new();
            let item = (s, n);
            let bytes = traits.serialize(&item).unwrap();
            let decoded = traits.deserialize(&bytes).unwrap();
            prop_assert_eq!(traits.compare(&item, &decoded), Ordering::Equal);
            prop_assert_eq!(traits.digest(&bytes), traits.digest(&traits.serialize(&decoded).unwrap()));
        }
    }
}
