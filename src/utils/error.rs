//! The `error` module defines the error types used within `popmq`.
//!
//! Codec errors stay local to one connection, broker errors become
//! `kind=Error` frames, and storage errors never leave the snapshotter.

use std::io;

use thiserror::Error;

use crate::protocol::{ErrorReason, MessageKind};

/// Failure to turn a `Message` into a frame.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("{field} length {len} does not fit the 64-bit length field")]
    FieldTooLong { field: &'static str, len: usize },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Failure to turn bytes into a `Message`.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("truncated frame: {field} needs {needed} bytes, {available} available")]
    Truncated {
        field: &'static str,
        needed: usize,
        available: usize,
    },

    #[error("unknown message kind {0}")]
    UnknownKind(u64),

    #[error("declared {field} length {len} cannot be addressed")]
    LengthOverflow { field: &'static str, len: u64 },

    #[error("topic is not valid UTF-8")]
    InvalidTopic(#[from] std::string::FromUtf8Error),

    #[error("{0} unexpected bytes after frame")]
    TrailingBytes(usize),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Request-level failures produced by the broker. Each one is answered with a
/// `kind=Error` frame; none of them closes the connection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BrokerError {
    #[error("id {id} is already live on topic '{topic}'")]
    DuplicateId { topic: String, id: u64 },

    #[error("no message available on topic '{0}'")]
    EmptyTopic(String),

    #[error("topic '{0}' does not exist")]
    UnknownTopic(String),

    #[error("request carries no topic name")]
    MissingTopicName,

    #[error("kind {0} is not a valid request")]
    UnexpectedKind(&'static str),
}

impl BrokerError {
    pub fn reason(&self) -> ErrorReason {
        match self {
            BrokerError::DuplicateId { .. } => ErrorReason::DuplicateId,
            BrokerError::EmptyTopic(_) => ErrorReason::EmptyTopic,
            BrokerError::UnknownTopic(_) => ErrorReason::UnknownTopic,
            BrokerError::MissingTopicName => ErrorReason::MissingTopic,
            BrokerError::UnexpectedKind(_) => ErrorReason::InvalidRequest,
        }
    }
}

/// Snapshot read/write failures. Logged and retried on the next tick.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("snapshot for topic '{topic}' is corrupt: {source}")]
    Corrupt {
        topic: String,
        #[source]
        source: DecodeError,
    },

    #[error("cannot encode snapshot for topic '{topic}': {source}")]
    Encode {
        topic: String,
        #[source]
        source: EncodeError,
    },

    #[error("storage slot '{0}' does not name a topic")]
    InvalidSlot(String),
}

/// Errors seen by protocol clients.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("connection closed by broker")]
    ConnectionClosed,

    #[error("broker rejected request: {0}")]
    Rejected(ErrorReason),

    #[error("expected a {expected} response, got {got}")]
    UnexpectedResponse {
        expected: MessageKind,
        got: MessageKind,
    },
}
