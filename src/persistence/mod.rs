//! The `persistence` module keeps topic queues durable across restarts.
//!
//! A `SnapshotStore` is an opaque set of named slots, one per topic, each
//! holding the topic's pending messages as concatenated wire frames. Two
//! stores are provided: a directory of files and an embedded `sled` database.
//! The `Snapshotter` decides what goes into the slots and when.

pub mod file_store;
pub mod sled_store;
pub mod snapshotter;

use std::fmt::Debug;
use std::sync::Arc;

use bytes::Bytes;

use crate::config::{StorageBackend, StorageSettings};
use crate::utils::error::StorageError;

pub use file_store::FileStore;
pub use sled_store::SledStore;
pub use snapshotter::{SnapshotReport, Snapshotter};

pub trait SnapshotStore: Debug + Send + Sync {
    /// Replace the slot for `topic` with `bytes`. The previous contents stay
    /// visible until the new ones are complete.
    fn save(&self, topic: &str, bytes: &[u8]) -> Result<(), StorageError>;

    /// Contents of the slot for `topic`, or `None` if it was never written.
    fn load(&self, topic: &str) -> Result<Option<Bytes>, StorageError>;

    /// Names of all topics with a slot, sorted.
    fn topics(&self) -> Result<Vec<String>, StorageError>;
}

/// Open the store selected by `settings`.
pub fn open_store(settings: &StorageSettings) -> Result<Arc<dyn SnapshotStore>, StorageError> {
    Ok(match settings.backend {
        StorageBackend::File => Arc::new(FileStore::open(&settings.path)?),
        StorageBackend::Sled => Arc::new(SledStore::open(&settings.path)?),
    })
}

#[cfg(test)]
mod tests;
