use std::fs;
use std::sync::Arc;

use bytes::Bytes;
use tempfile::tempdir;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

use super::*;
use crate::broker::{Broker, Dispatcher};
use crate::config::{StorageBackend, StorageSettings};
use crate::protocol::{ErrorReason, Message, encode};
use crate::utils::error::StorageError;

const LEASE: Duration = Duration::from_secs(30);

/// Store that refuses to write one topic.
#[derive(Debug)]
struct FailingStore {
    inner: FileStore,
    broken_topic: &'static str,
}

impl SnapshotStore for FailingStore {
    fn save(&self, topic: &str, bytes: &[u8]) -> Result<(), StorageError> {
        if topic == self.broken_topic {
            return Err(StorageError::Io(std::io::Error::other("disk full")));
        }
        self.inner.save(topic, bytes)
    }

    fn load(&self, topic: &str) -> Result<Option<Bytes>, StorageError> {
        self.inner.load(topic)
    }

    fn topics(&self) -> Result<Vec<String>, StorageError> {
        self.inner.topics()
    }
}

fn consume_ids(dispatcher: &Dispatcher, topic: &str) -> Vec<u64> {
    let mut ids = Vec::new();
    loop {
        let response = dispatcher.dispatch(Message::consume(topic));
        if response.error_reason() == Some(ErrorReason::EmptyTopic) {
            return ids;
        }
        dispatcher.dispatch(Message::ack(response.id, topic));
        ids.push(response.id);
    }
}

#[test]
fn test_file_store_save_and_load() {
    let dir = tempdir().unwrap();
    let store = FileStore::open(dir.path()).unwrap();

    store.save("orders", b"first").unwrap();
    assert_eq!(store.load("orders").unwrap().unwrap(), Bytes::from("first"));

    store.save("orders", b"second").unwrap();
    assert_eq!(store.load("orders").unwrap().unwrap(), Bytes::from("second"));
    assert_eq!(store.topics().unwrap(), vec!["orders".to_string()]);
}

#[test]
fn test_file_store_missing_slot() {
    let dir = tempdir().unwrap();
    let store = FileStore::open(dir.path().join("nested/data")).unwrap();
    assert!(store.load("nope").unwrap().is_none());
    assert!(store.topics().unwrap().is_empty());
}

#[test]
fn test_file_store_handles_unusual_topic_names() {
    let dir = tempdir().unwrap();
    let store = FileStore::open(dir.path()).unwrap();
    let names = ["a/b/../c", "主题", "with space", ".hidden"];
    for name in names {
        store.save(name, name.as_bytes()).unwrap();
    }

    let mut expected: Vec<String> = names.iter().map(|s| s.to_string()).collect();
    expected.sort();
    assert_eq!(store.topics().unwrap(), expected);
    for name in names {
        assert_eq!(store.load(name).unwrap().unwrap(), name.as_bytes());
    }
}

#[test]
fn test_file_store_leaves_no_temp_files() {
    let dir = tempdir().unwrap();
    let store = FileStore::open(dir.path()).unwrap();
    store.save("t", b"one").unwrap();
    store.save("t", b"two").unwrap();

    let files: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(files.len(), 1);
}

#[test]
fn test_file_store_ignores_foreign_files() {
    let dir = tempdir().unwrap();
    let store = FileStore::open(dir.path()).unwrap();
    fs::write(dir.path().join("notes.txt"), "x").unwrap();
    fs::write(dir.path().join("zz.snap"), "x").unwrap();
    store.save("real", b"").unwrap();
    assert_eq!(store.topics().unwrap(), vec!["real".to_string()]);
}

#[test]
fn test_sled_store_save_load_and_list() {
    let dir = tempdir().unwrap();
    let store = SledStore::open(dir.path()).unwrap();

    store.save("b", b"beta").unwrap();
    store.save("a", b"alpha").unwrap();
    store.save("a", b"alpha2").unwrap();

    assert_eq!(store.load("a").unwrap().unwrap(), Bytes::from("alpha2"));
    assert!(store.load("c").unwrap().is_none());
    assert_eq!(store.topics().unwrap(), vec!["a", "b"]);
}

#[test]
fn test_open_store_by_backend() {
    let dir = tempdir().unwrap();
    for backend in [StorageBackend::File, StorageBackend::Sled] {
        let settings = StorageSettings {
            backend,
            path: dir
                .path()
                .join(format!("{backend:?}"))
                .to_string_lossy()
                .into_owned(),
        };
        let store = open_store(&settings).unwrap();
        store.save("t", b"x").unwrap();
        assert_eq!(store.topics().unwrap(), vec!["t".to_string()]);
    }
}

#[test]
fn test_snapshot_survives_restart() {
    let dir = tempdir().unwrap();
    let store: Arc<dyn SnapshotStore> = Arc::new(FileStore::open(dir.path()).unwrap());

    let broker = Arc::new(Broker::new());
    let dispatcher = Dispatcher::new(broker.clone(), LEASE);
    for id in 1..=3 {
        dispatcher.dispatch(Message::produce(id, "t", format!("m{id}")));
    }
    let report = Snapshotter::new(broker, store.clone()).snapshot_once();
    assert_eq!(report, SnapshotReport { written: 1, failed: 0 });

    let restarted = Arc::new(Broker::new());
    let restored = Snapshotter::new(restarted.clone(), store).restore().unwrap();
    assert_eq!(restored, 3);

    let dispatcher = Dispatcher::new(restarted, LEASE);
    let first = dispatcher.dispatch(Message::consume("t"));
    assert_eq!(first.payload, "m1");
    dispatcher.dispatch(Message::ack(first.id, "t"));
    assert_eq!(consume_ids(&dispatcher, "t"), vec![2, 3]);
}

#[test]
fn test_snapshot_excludes_in_flight() {
    let dir = tempdir().unwrap();
    let store: Arc<dyn SnapshotStore> = Arc::new(SledStore::open(dir.path()).unwrap());

    let broker = Arc::new(Broker::new());
    let dispatcher = Dispatcher::new(broker.clone(), LEASE);
    for id in 1..=4 {
        dispatcher.dispatch(Message::produce(id, "t", "x"));
    }
    assert_eq!(dispatcher.dispatch(Message::consume("t")).id, 1);
    Snapshotter::new(broker, store.clone()).snapshot_once();

    let restarted = Arc::new(Broker::new());
    Snapshotter::new(restarted.clone(), store).restore().unwrap();
    let dispatcher = Dispatcher::new(restarted, LEASE);
    assert_eq!(consume_ids(&dispatcher, "t"), vec![2, 3, 4]);
}

#[test]
fn test_snapshot_overwrites_drained_topic() {
    let dir = tempdir().unwrap();
    let store: Arc<dyn SnapshotStore> = Arc::new(FileStore::open(dir.path()).unwrap());
    let broker = Arc::new(Broker::new());
    let dispatcher = Dispatcher::new(broker.clone(), LEASE);
    let snapshotter = Snapshotter::new(broker, store.clone());

    dispatcher.dispatch(Message::produce(1, "t", "x"));
    snapshotter.snapshot_once();
    assert_eq!(consume_ids(&dispatcher, "t"), vec![1]);
    snapshotter.snapshot_once();

    assert_eq!(store.load("t").unwrap().unwrap().len(), 0);
}

#[test]
fn test_snapshot_failure_does_not_stop_other_topics() {
    let dir = tempdir().unwrap();
    let store = Arc::new(FailingStore {
        inner: FileStore::open(dir.path()).unwrap(),
        broken_topic: "b",
    });
    let broker = Arc::new(Broker::new());
    let dispatcher = Dispatcher::new(broker.clone(), LEASE);
    for topic in ["a", "b", "c"] {
        dispatcher.dispatch(Message::produce(1, topic, "x"));
    }

    let report = Snapshotter::new(broker, store.clone()).snapshot_once();
    assert_eq!(report, SnapshotReport { written: 2, failed: 1 });
    assert_eq!(store.topics().unwrap(), vec!["a", "c"]);
}

#[test]
fn test_restore_skips_corrupt_slot() {
    let dir = tempdir().unwrap();
    let store = Arc::new(FileStore::open(dir.path()).unwrap());
    store.save("bad", b"\x01\x02\x03").unwrap();
    let good = encode(&Message::produce(9, "good", "ok")).unwrap();
    store.save("good", &good).unwrap();

    let broker = Arc::new(Broker::new());
    let restored = Snapshotter::new(broker.clone(), store).restore().unwrap();
    assert_eq!(restored, 1);
    assert!(broker.get("bad").is_none());
    assert_eq!(broker.get("good").unwrap().lock().pending_len(), 1);
}

#[tokio::test]
async fn test_run_writes_periodically_and_on_shutdown() {
    let dir = tempdir().unwrap();
    let store: Arc<dyn SnapshotStore> = Arc::new(FileStore::open(dir.path()).unwrap());
    let broker = Arc::new(Broker::new());
    let dispatcher = Dispatcher::new(broker.clone(), LEASE);
    dispatcher.dispatch(Message::produce(1, "t", "x"));

    let shutdown = CancellationToken::new();
    let handle = tokio::spawn(
        Snapshotter::new(broker, store.clone()).run(Duration::from_millis(20), shutdown.clone()),
    );

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(store.load("t").unwrap().is_some());

    dispatcher.dispatch(Message::produce(2, "t", "y"));
    shutdown.cancel();
    handle.await.unwrap();

    let restarted = Arc::new(Broker::new());
    assert_eq!(
        Snapshotter::new(restarted, store).restore().unwrap(),
        2
    );
}
