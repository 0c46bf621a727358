//! Shared helpers for engine integration tests

#![allow(dead_code)]

use digestkv_core::{Digest, OpenPolicy, Result, SerdeTraits, TypeTraits};
use digestkv_engine::{SerdeStore, Store};
use std::cmp::Ordering;
use std::path::PathBuf;
use tempfile::TempDir;

/// Install a fmt subscriber once; later calls are no-ops
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Path for a store file inside `dir`
pub fn store_path(dir: &TempDir) -> PathBuf {
    dir.path().join("store.db")
}

pub type PairStore = SerdeStore<(String, i32), (String, i32)>;

pub fn create_pair_store() -> (TempDir, PairStore) {
    init_tracing();
    let temp_dir = TempDir::new().unwrap();
    let store = PairStore::create_serde(store_path(&temp_dir), OpenPolicy::CREATE).unwrap();
    (temp_dir, store)
}

pub fn pair(s: &str, n: i32) -> (String, i32) {
    (s.to_string(), n)
}

/// Key traits whose digest ignores the key: every key collides
#[derive(Debug, Default, Clone, Copy)]
pub struct CollidingTraits {
    inner: SerdeTraits<String>,
}

impl TypeTraits for CollidingTraits {
    type Item = String;

    fn serialize(&self, item: &String) -> Result<Vec<u8>> {
        self.inner.serialize(item)
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<String> {
        self.inner.deserialize(bytes)
    }

    fn compare(&self, a: &String, b: &String) -> Ordering {
        self.inner.compare(a, b)
    }

    fn digest(&self, _encoded: &[u8]) -> Digest {
        [0x5A; 32]
    }
}

pub type CollidingStore = Store<CollidingTraits, SerdeTraits<i64>>;

pub fn create_colliding_store() -> (TempDir, CollidingStore) {
    init_tracing();
    let temp_dir = TempDir::new().unwrap();
    let store = CollidingStore::create(
        store_path(&temp_dir),
        CollidingTraits::default(),
        SerdeTraits::new(),
        OpenPolicy::CREATE,
    )
    .unwrap();
    (temp_dir, store)
}
