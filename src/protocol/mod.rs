//! The `protocol` module defines the binary frame exchanged with clients and
//! written to snapshots: the `Message` model and its length-prefixed codec.

pub mod codec;
pub mod message;

pub use codec::{MessageCodec, decode, decode_all, encode};
pub use message::{ErrorReason, Message, MessageKind};
