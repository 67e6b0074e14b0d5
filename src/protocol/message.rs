//! Message definitions
//!
//! `Message` is both the wire unit and the stored unit. The same struct is
//! used for requests, responses and snapshot entries; `kind` tells them apart.
//!
//! Notes on fields:
//! - `id`: assigned by the producer, unique among live messages of a topic
//! - `topic`: routing and storage key
//! - `kind`: selects the dispatcher branch and marks responses
//! - `payload`: opaque body; empty except for produce requests, delivered
//!   messages and the reason string of error responses

use std::fmt;

use bytes::Bytes;

use crate::utils::error::DecodeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Consume,
    Produce,
    Ack,
    Error,
}

impl MessageKind {
    pub fn code(self) -> u64 {
        match self {
            MessageKind::Consume => 1,
            MessageKind::Produce => 2,
            MessageKind::Ack => 3,
            MessageKind::Error => 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MessageKind::Consume => "consume",
            MessageKind::Produce => "produce",
            MessageKind::Ack => "ack",
            MessageKind::Error => "error",
        }
    }
}

impl TryFrom<u64> for MessageKind {
    type Error = DecodeError;

    fn try_from(code: u64) -> Result<Self, DecodeError> {
        match code {
            1 => Ok(MessageKind::Consume),
            2 => Ok(MessageKind::Produce),
            3 => Ok(MessageKind::Ack),
            4 => Ok(MessageKind::Error),
            other => Err(DecodeError::UnknownKind(other)),
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reason carried in the payload of a `kind=Error` frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorReason {
    /// Nothing pending on the topic. A normal, pollable state.
    EmptyTopic,
    DuplicateId,
    UnknownTopic,
    MissingTopic,
    InvalidRequest,
    MalformedFrame,
}

impl ErrorReason {
    const ALL: [ErrorReason; 6] = [
        ErrorReason::EmptyTopic,
        ErrorReason::DuplicateId,
        ErrorReason::UnknownTopic,
        ErrorReason::MissingTopic,
        ErrorReason::InvalidRequest,
        ErrorReason::MalformedFrame,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorReason::EmptyTopic => "empty_topic",
            ErrorReason::DuplicateId => "duplicate_id",
            ErrorReason::UnknownTopic => "unknown_topic",
            ErrorReason::MissingTopic => "missing_topic",
            ErrorReason::InvalidRequest => "invalid_request",
            ErrorReason::MalformedFrame => "malformed_frame",
        }
    }

    pub fn from_payload(payload: &[u8]) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|reason| reason.as_str().as_bytes() == payload)
    }
}

impl fmt::Display for ErrorReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: u64,
    pub topic: String,
    pub kind: MessageKind,
    pub payload: Bytes,
}

impl Message {
    pub fn new(id: u64, topic: impl Into<String>, kind: MessageKind, payload: Bytes) -> Self {
        Self {
            id,
            topic: topic.into(),
            kind,
            payload,
        }
    }

    pub fn produce(id: u64, topic: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self::new(id, topic, MessageKind::Produce, payload.into())
    }

    pub fn consume(topic: impl Into<String>) -> Self {
        Self::new(0, topic, MessageKind::Consume, Bytes::new())
    }

    pub fn ack(id: u64, topic: impl Into<String>) -> Self {
        Self::new(id, topic, MessageKind::Ack, Bytes::new())
    }

    pub fn error(id: u64, topic: impl Into<String>, reason: ErrorReason) -> Self {
        Self::new(
            id,
            topic,
            MessageKind::Error,
            Bytes::from_static(reason.as_str().as_bytes()),
        )
    }

    /// Copy of this message with a different kind and the payload kept.
    pub fn with_kind(&self, kind: MessageKind) -> Self {
        Self {
            kind,
            ..self.clone()
        }
    }

    /// Same id and topic, given kind, no payload. Used for confirmations.
    pub fn echo(&self, kind: MessageKind) -> Self {
        Self::new(self.id, self.topic.clone(), kind, Bytes::new())
    }

    /// The error reason for `kind=Error` frames, if it is one we know.
    pub fn error_reason(&self) -> Option<ErrorReason> {
        match self.kind {
            MessageKind::Error => ErrorReason::from_payload(&self.payload),
            _ => None,
        }
    }
}
