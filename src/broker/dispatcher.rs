//! Request dispatcher
//!
//! Turns one decoded request into one response. Every request gets an
//! answer: broker-level failures are returned as `kind=Error` frames whose
//! payload names the reason, so a client never has to tell a rejected
//! request apart from a broken connection.

use std::sync::Arc;

use tokio::time::{Duration, Instant};
use tracing::debug;

use crate::broker::engine::Broker;
use crate::protocol::{Message, MessageKind};
use crate::utils::error::BrokerError;

#[derive(Debug, Clone)]
pub struct Dispatcher {
    broker: Arc<Broker>,
    lease: Duration,
}

impl Dispatcher {
    pub fn new(broker: Arc<Broker>, lease: Duration) -> Self {
        Self { broker, lease }
    }

    pub fn broker(&self) -> &Arc<Broker> {
        &self.broker
    }

    pub fn lease(&self) -> Duration {
        self.lease
    }

    pub fn dispatch(&self, request: Message) -> Message {
        self.dispatch_at(request, Instant::now())
    }

    /// Like `dispatch`, with leases measured from `now`.
    pub fn dispatch_at(&self, request: Message, now: Instant) -> Message {
        let id = request.id;
        let topic = request.topic.clone();
        let kind = request.kind;

        match self.handle(request, now) {
            Ok(response) => response,
            Err(err) => {
                debug!(%kind, %topic, id, "request rejected: {err}");
                Message::error(id, topic, err.reason())
            }
        }
    }

    fn handle(&self, request: Message, now: Instant) -> Result<Message, BrokerError> {
        match request.kind {
            MessageKind::Error => Err(BrokerError::UnexpectedKind(MessageKind::Error.as_str())),
            _ if request.topic.is_empty() => Err(BrokerError::MissingTopicName),
            MessageKind::Produce => self.produce(request),
            MessageKind::Consume => self.consume(&request.topic, now),
            MessageKind::Ack => self.ack(&request),
        }
    }

    fn produce(&self, request: Message) -> Result<Message, BrokerError> {
        let topic = self.broker.get_or_create(&request.topic);
        let confirmation = request.echo(MessageKind::Produce);
        topic.lock().enqueue(request)?;
        Ok(confirmation)
    }

    fn consume(&self, name: &str, now: Instant) -> Result<Message, BrokerError> {
        let topic = self.broker.get_or_create(name);
        let delivered = topic.lock().dequeue_for_delivery(now, self.lease);
        delivered
            .map(|msg| msg.with_kind(MessageKind::Consume))
            .ok_or_else(|| BrokerError::EmptyTopic(name.to_string()))
    }

    fn ack(&self, request: &Message) -> Result<Message, BrokerError> {
        let topic = self
            .broker
            .get(&request.topic)
            .ok_or_else(|| BrokerError::UnknownTopic(request.topic.clone()))?;
        if !topic.lock().acknowledge(request.id) {
            debug!(topic = %request.topic, id = request.id, "ack for id not in flight");
        }
        Ok(request.echo(MessageKind::Ack))
    }
}
