//! Broker engine
//!
//! This module contains the topic registry. It is responsible for:
//! - creating topics on first reference, exactly once per name
//! - handing out per-topic handles so callers lock only the topic they touch
//! - running the redelivery sweep across all topics
//!
//! Concurrency and usage notes:
//! - The registry map has its own narrow lock, taken for lookups and topic
//!   creation only. It is never held while a topic lock is held.
//! - Callers must not hold a topic lock across network or disk I/O; copy what
//!   is needed and release it first.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, info};

use crate::broker::topic::TopicQueue;

pub type SharedTopic = Arc<Mutex<TopicQueue>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicStats {
    pub name: String,
    pub pending: usize,
    pub in_flight: usize,
}

#[derive(Debug, Default)]
pub struct Broker {
    topics: RwLock<BTreeMap<String, SharedTopic>>,
}

impl Broker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the topic for `name`, creating and registering an empty one if
    /// it does not exist yet. Concurrent callers naming the same new topic all
    /// receive the same instance.
    pub fn get_or_create(&self, name: &str) -> SharedTopic {
        if let Some(topic) = self.topics.read().get(name) {
            return topic.clone();
        }

        let mut topics = self.topics.write();
        topics
            .entry(name.to_string())
            .or_insert_with(|| {
                info!(topic = name, "created topic");
                Arc::new(Mutex::new(TopicQueue::new(name)))
            })
            .clone()
    }

    pub fn get(&self, name: &str) -> Option<SharedTopic> {
        self.topics.read().get(name).cloned()
    }

    /// Topic names in sorted order.
    pub fn list_topics(&self) -> Vec<String> {
        self.topics.read().keys().cloned().collect()
    }

    /// Handles to every topic in name order, detached from the registry lock.
    pub fn topics(&self) -> Vec<(String, SharedTopic)> {
        self.topics
            .read()
            .iter()
            .map(|(name, topic)| (name.clone(), topic.clone()))
            .collect()
    }

    /// Requeue expired leases on every topic. Returns the number requeued.
    pub fn sweep_expired(&self, now: Instant) -> usize {
        let mut requeued = 0;
        for (name, topic) in self.topics() {
            let ids = topic.lock().sweep_expired(now);
            if !ids.is_empty() {
                debug!(topic = %name, ?ids, "lease expired, requeued at head");
                requeued += ids.len();
            }
        }
        requeued
    }

    pub fn stats(&self) -> Vec<TopicStats> {
        self.topics()
            .into_iter()
            .map(|(name, topic)| {
                let topic = topic.lock();
                TopicStats {
                    name,
                    pending: topic.pending_len(),
                    in_flight: topic.in_flight_len(),
                }
            })
            .collect()
    }
}
