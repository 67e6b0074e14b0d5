//! Wire codec
//!
//! Frame layout, all integers little-endian `u64`:
//!
//! ```text
//! id | topic_len | topic | kind | payload_len | payload
//! ```
//!
//! Lengths are always computed from the actual field contents on encode, and
//! decoding reads exactly the declared number of bytes for each field.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::protocol::message::{Message, MessageKind};
use crate::utils::error::{DecodeError, EncodeError};

const FIELD_LEN: usize = 8;

/// Largest chunk the streaming decoder reserves ahead of received data.
const MAX_RESERVE: usize = 64 * 1024;

pub fn encoded_len(msg: &Message) -> usize {
    4 * FIELD_LEN + msg.topic.len() + msg.payload.len()
}

fn length_field(field: &'static str, len: usize) -> Result<u64, EncodeError> {
    u64::try_from(len).map_err(|_| EncodeError::FieldTooLong { field, len })
}

/// Append the frame for `msg` to `dst`.
pub fn encode_into(msg: &Message, dst: &mut BytesMut) -> Result<(), EncodeError> {
    let topic_len = length_field("topic", msg.topic.len())?;
    let payload_len = length_field("payload", msg.payload.len())?;

    dst.reserve(encoded_len(msg));
    dst.put_u64_le(msg.id);
    dst.put_u64_le(topic_len);
    dst.put_slice(msg.topic.as_bytes());
    dst.put_u64_le(msg.kind.code());
    dst.put_u64_le(payload_len);
    dst.put_slice(&msg.payload);
    Ok(())
}

pub fn encode(msg: &Message) -> Result<Bytes, EncodeError> {
    let mut buf = BytesMut::with_capacity(encoded_len(msg));
    encode_into(msg, &mut buf)?;
    Ok(buf.freeze())
}

fn take_u64(buf: &mut Bytes, field: &'static str) -> Result<u64, DecodeError> {
    if buf.remaining() < FIELD_LEN {
        return Err(DecodeError::Truncated {
            field,
            needed: FIELD_LEN,
            available: buf.remaining(),
        });
    }
    Ok(buf.get_u64_le())
}

fn take_len(buf: &mut Bytes, field: &'static str) -> Result<usize, DecodeError> {
    let len = take_u64(buf, field)?;
    usize::try_from(len).map_err(|_| DecodeError::LengthOverflow { field, len })
}

fn take_bytes(buf: &mut Bytes, len: usize, field: &'static str) -> Result<Bytes, DecodeError> {
    if buf.remaining() < len {
        return Err(DecodeError::Truncated {
            field,
            needed: len,
            available: buf.remaining(),
        });
    }
    Ok(buf.split_to(len))
}

/// Decode one frame from the front of `buf`, leaving any following bytes.
pub fn decode_frame(buf: &mut Bytes) -> Result<Message, DecodeError> {
    let id = take_u64(buf, "id")?;
    let topic_len = take_len(buf, "topic_len")?;
    let topic = take_bytes(buf, topic_len, "topic")?;
    let topic = String::from_utf8(topic.to_vec())?;
    let kind = MessageKind::try_from(take_u64(buf, "kind")?)?;
    let payload_len = take_len(buf, "payload_len")?;
    let payload = take_bytes(buf, payload_len, "payload")?;

    Ok(Message {
        id,
        topic,
        kind,
        payload,
    })
}

/// Decode a buffer holding exactly one frame.
pub fn decode(bytes: &[u8]) -> Result<Message, DecodeError> {
    let mut buf = Bytes::copy_from_slice(bytes);
    let msg = decode_frame(&mut buf)?;
    if buf.has_remaining() {
        return Err(DecodeError::TrailingBytes(buf.remaining()));
    }
    Ok(msg)
}

/// Decode a concatenation of frames, in order.
pub fn decode_all(mut bytes: Bytes) -> Result<Vec<Message>, DecodeError> {
    let mut messages = Vec::new();
    while bytes.has_remaining() {
        messages.push(decode_frame(&mut bytes)?);
    }
    Ok(messages)
}

fn peek_len(src: &[u8], at: usize, field: &'static str) -> Result<usize, DecodeError> {
    let mut raw = [0u8; FIELD_LEN];
    raw.copy_from_slice(&src[at..at + FIELD_LEN]);
    let len = u64::from_le_bytes(raw);
    usize::try_from(len).map_err(|_| DecodeError::LengthOverflow { field, len })
}

fn overflow(field: &'static str, len: usize) -> DecodeError {
    DecodeError::LengthOverflow {
        field,
        len: len as u64,
    }
}

/// Total frame size declared by the buffered header, once enough of it has
/// arrived to know. `Ok(None)` means more header bytes are needed.
pub fn declared_frame_len(src: &[u8]) -> Result<Option<usize>, DecodeError> {
    if src.len() < 2 * FIELD_LEN {
        return Ok(None);
    }
    let topic_len = peek_len(src, FIELD_LEN, "topic_len")?;
    let kind_at = (2 * FIELD_LEN)
        .checked_add(topic_len)
        .ok_or_else(|| overflow("topic_len", topic_len))?;
    let header_end = kind_at
        .checked_add(2 * FIELD_LEN)
        .ok_or_else(|| overflow("topic_len", topic_len))?;
    let payload_len_at = kind_at + FIELD_LEN;
    if src.len() < header_end {
        return Ok(None);
    }
    let payload_len = peek_len(src, payload_len_at, "payload_len")?;
    header_end
        .checked_add(payload_len)
        .map(Some)
        .ok_or_else(|| overflow("payload_len", payload_len))
}

/// Streaming codec for framed TCP connections.
#[derive(Debug, Default, Clone, Copy)]
pub struct MessageCodec;

impl Decoder for MessageCodec {
    type Item = Message;
    type Error = DecodeError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Message>, DecodeError> {
        let Some(total) = declared_frame_len(src)? else {
            src.reserve(4 * FIELD_LEN);
            return Ok(None);
        };
        if src.len() < total {
            // Grow with the data actually received rather than the declared length.
            src.reserve((total - src.len()).min(MAX_RESERVE));
            return Ok(None);
        }
        let mut frame = src.split_to(total).freeze();
        decode_frame(&mut frame).map(Some)
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Message>, DecodeError> {
        match self.decode(buf)? {
            Some(msg) => Ok(Some(msg)),
            None if buf.is_empty() => Ok(None),
            None => {
                let needed = declared_frame_len(buf)?.unwrap_or(4 * FIELD_LEN);
                Err(DecodeError::Truncated {
                    field: "frame",
                    needed,
                    available: buf.len(),
                })
            }
        }
    }
}

impl Encoder<Message> for MessageCodec {
    type Error = EncodeError;

    fn encode(&mut self, item: Message, dst: &mut BytesMut) -> Result<(), EncodeError> {
        encode_into(&item, dst)
    }
}
