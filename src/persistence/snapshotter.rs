//! Snapshotter
//!
//! Periodically writes each topic's pending queue to its storage slot as a
//! concatenation of encoded frames, and reloads those slots at startup.
//! In-flight messages are not written; after a restart they count as never
//! delivered.
//!
//! The topic lock is held only while copying the pending queue. Encoding and
//! storage I/O happen after it is released, on the blocking thread pool.

use std::sync::Arc;

use bytes::BytesMut;
use tokio::time::{Duration, Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::broker::Broker;
use crate::persistence::SnapshotStore;
use crate::protocol::{Message, codec, decode_all};
use crate::utils::error::StorageError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnapshotReport {
    pub written: usize,
    pub failed: usize,
}

#[derive(Debug, Clone)]
pub struct Snapshotter {
    broker: Arc<Broker>,
    store: Arc<dyn SnapshotStore>,
}

impl Snapshotter {
    pub fn new(broker: Arc<Broker>, store: Arc<dyn SnapshotStore>) -> Self {
        Self { broker, store }
    }

    /// Write one snapshot of every topic. A failure on one topic is logged
    /// and does not stop the others.
    pub fn snapshot_once(&self) -> SnapshotReport {
        let mut report = SnapshotReport::default();
        for (name, topic) in self.broker.topics() {
            let pending = topic.lock().pending_snapshot();
            match self.write_topic(&name, &pending) {
                Ok(()) => {
                    debug!(topic = %name, messages = pending.len(), "snapshot written");
                    report.written += 1;
                }
                Err(e) => {
                    error!(topic = %name, "snapshot failed: {e}");
                    report.failed += 1;
                }
            }
        }
        report
    }

    fn write_topic(&self, name: &str, pending: &[Message]) -> Result<(), StorageError> {
        let mut buf = BytesMut::new();
        for msg in pending {
            codec::encode_into(msg, &mut buf).map_err(|source| StorageError::Encode {
                topic: name.to_string(),
                source,
            })?;
        }
        self.store.save(name, &buf)
    }

    /// Load every stored slot into the broker's pending queues, in stored
    /// order. Must run before connections are accepted. A corrupt slot is
    /// logged and skipped; failing to list slots is returned.
    pub fn restore(&self) -> Result<usize, StorageError> {
        let mut restored = 0;
        for name in self.store.topics()? {
            match self.restore_topic(&name) {
                Ok(count) => {
                    info!(topic = %name, messages = count, "restored snapshot");
                    restored += count;
                }
                Err(e) => error!(topic = %name, "skipping snapshot: {e}"),
            }
        }
        Ok(restored)
    }

    fn restore_topic(&self, name: &str) -> Result<usize, StorageError> {
        let Some(raw) = self.store.load(name)? else {
            return Ok(0);
        };
        let messages = decode_all(raw).map_err(|source| StorageError::Corrupt {
            topic: name.to_string(),
            source,
        })?;
        Ok(self.broker.get_or_create(name).lock().restore(messages))
    }

    async fn snapshot_in_background(&self) -> SnapshotReport {
        let this = self.clone();
        match tokio::task::spawn_blocking(move || this.snapshot_once()).await {
            Ok(report) => report,
            Err(e) => {
                error!("snapshot task failed: {e}");
                SnapshotReport::default()
            }
        }
    }

    /// Snapshot every `period` until `shutdown` fires, then write one final
    /// snapshot and return.
    pub async fn run(self, period: Duration, shutdown: CancellationToken) {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    let report = self.snapshot_in_background().await;
                    info!(written = report.written, failed = report.failed, "final snapshot");
                    break;
                }
                _ = ticker.tick() => {
                    let report = self.snapshot_in_background().await;
                    if report.failed > 0 {
                        error!(failed = report.failed, "snapshot incomplete, retrying next tick");
                    }
                }
            }
        }
    }
}
