//! Persistence layer backed by `sled`
//!
//! Snapshot slots live in a dedicated `snapshots` tree, one key per topic
//! name. A single `insert` replaces the whole slot, so readers never observe
//! a half-written snapshot; the tree is flushed after every write.

use std::path::Path;

use bytes::Bytes;
use sled::{Db, Tree};

use crate::persistence::SnapshotStore;
use crate::utils::error::StorageError;

const SNAPSHOT_TREE: &str = "snapshots";

#[derive(Clone)]
pub struct SledStore {
    db: Db,
    snapshots: Tree,
}

impl SledStore {
    /// Open or create a sled database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let db = sled::open(path)?;
        let snapshots = db.open_tree(SNAPSHOT_TREE)?;
        Ok(Self { db, snapshots })
    }

    pub fn was_recovered(&self) -> bool {
        self.db.was_recovered()
    }
}

impl SnapshotStore for SledStore {
    fn save(&self, topic: &str, bytes: &[u8]) -> Result<(), StorageError> {
        self.snapshots.insert(topic.as_bytes(), bytes)?;
        self.snapshots.flush()?;
        Ok(())
    }

    fn load(&self, topic: &str) -> Result<Option<Bytes>, StorageError> {
        Ok(self
            .snapshots
            .get(topic.as_bytes())?
            .map(|raw| Bytes::copy_from_slice(&raw)))
    }

    fn topics(&self) -> Result<Vec<String>, StorageError> {
        self.snapshots
            .iter()
            .keys()
            .map(|key| {
                let key = key?;
                String::from_utf8(key.to_vec())
                    .map_err(|_| StorageError::InvalidSlot(String::from_utf8_lossy(&key).into()))
            })
            .collect()
    }
}

impl std::fmt::Debug for SledStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SledStore")
            .field("db", &"sled::Db")
            .finish()
    }
}
