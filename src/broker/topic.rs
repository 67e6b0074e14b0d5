//! Topic queue
//!
//! A `TopicQueue` holds the pending FIFO and the in-flight leases of one topic.
//! A message id lives in exactly one of the two containers, and `live` tracks
//! the union so duplicate checks do not scan the queue.
//!
//! Concurrency note: the queue itself is not synchronized. The broker wraps
//! each queue in its own mutex so that unrelated topics never contend.

use std::collections::{HashMap, HashSet, VecDeque};

use tokio::time::{Duration, Instant};
use tracing::warn;

use crate::protocol::Message;
use crate::utils::error::BrokerError;

#[derive(Debug, Clone)]
pub struct InFlight {
    pub message: Message,
    pub deadline: Instant,
}

#[derive(Debug)]
pub struct TopicQueue {
    pub name: String,
    pending: VecDeque<Message>,
    in_flight: HashMap<u64, InFlight>,
    live: HashSet<u64>,
}

impl TopicQueue {
    /// Create an empty queue for the given topic name.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            pending: VecDeque::new(),
            in_flight: HashMap::new(),
            live: HashSet::new(),
        }
    }

    /// Append to the tail of the pending queue. Fails if the id is already
    /// queued or in flight.
    pub fn enqueue(&mut self, msg: Message) -> Result<(), BrokerError> {
        if !self.live.insert(msg.id) {
            return Err(BrokerError::DuplicateId {
                topic: self.name.clone(),
                id: msg.id,
            });
        }
        self.pending.push_back(msg);
        Ok(())
    }

    /// Move the head of the queue into flight with a lease ending at
    /// `now + lease`. An empty queue yields `None`.
    pub fn dequeue_for_delivery(&mut self, now: Instant, lease: Duration) -> Option<Message> {
        let message = self.pending.pop_front()?;
        self.in_flight.insert(
            message.id,
            InFlight {
                message: message.clone(),
                deadline: now + lease,
            },
        );
        Some(message)
    }

    /// Drop an in-flight message. Returns whether it was in flight.
    pub fn acknowledge(&mut self, id: u64) -> bool {
        if self.in_flight.remove(&id).is_some() {
            self.live.remove(&id);
            true
        } else {
            false
        }
    }

    /// Requeue every lease that ended at or before `now` at the head of the
    /// pending queue, earliest deadline first. Returns the requeued ids in
    /// their new queue order.
    pub fn sweep_expired(&mut self, now: Instant) -> Vec<u64> {
        let mut expired: Vec<(Instant, u64)> = self
            .in_flight
            .iter()
            .filter(|(_, entry)| entry.deadline <= now)
            .map(|(id, entry)| (entry.deadline, *id))
            .collect();
        if expired.is_empty() {
            return Vec::new();
        }
        expired.sort_unstable();

        for (_, id) in expired.iter().rev() {
            if let Some(entry) = self.in_flight.remove(id) {
                self.pending.push_front(entry.message);
            }
        }
        expired.into_iter().map(|(_, id)| id).collect()
    }

    /// Copy of the pending queue in delivery order.
    pub fn pending_snapshot(&self) -> Vec<Message> {
        self.pending.iter().cloned().collect()
    }

    /// Append restored messages, skipping ids that are already live.
    /// Returns how many were accepted.
    pub fn restore(&mut self, messages: impl IntoIterator<Item = Message>) -> usize {
        let mut restored = 0;
        for msg in messages {
            let id = msg.id;
            match self.enqueue(msg) {
                Ok(()) => restored += 1,
                Err(_) => warn!(topic = %self.name, id, "skipping duplicate id in snapshot"),
            }
        }
        restored
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }

    pub fn is_in_flight(&self, id: u64) -> bool {
        self.in_flight.contains_key(&id)
    }
}
