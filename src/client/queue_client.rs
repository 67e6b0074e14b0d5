use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio_util::codec::Framed;

use crate::protocol::{ErrorReason, Message, MessageCodec, MessageKind};
use crate::utils::error::ClientError;

/// A protocol client holding one broker connection.
///
/// Requests are strictly sequential: each call writes one frame and waits
/// for the matching response before returning.
#[derive(Debug)]
pub struct Client<S = TcpStream> {
    frames: Framed<S, MessageCodec>,
}

impl Client<TcpStream> {
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr).await?;
        Ok(Self::new(stream))
    }
}

impl<S> Client<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S) -> Self {
        Self {
            frames: Framed::new(stream, MessageCodec),
        }
    }

    /// Send a raw request and return the raw response.
    pub async fn request(&mut self, msg: Message) -> Result<Message, ClientError> {
        self.frames.send(msg).await?;
        match self.frames.next().await {
            Some(response) => Ok(response?),
            None => Err(ClientError::ConnectionClosed),
        }
    }

    pub async fn produce(
        &mut self,
        topic: &str,
        id: u64,
        payload: impl Into<Bytes>,
    ) -> Result<(), ClientError> {
        let response = self.request(Message::produce(id, topic, payload)).await?;
        expect_kind(&response, MessageKind::Produce)
    }

    /// Pull the next message. `Ok(None)` when the topic has nothing pending.
    pub async fn consume(&mut self, topic: &str) -> Result<Option<Message>, ClientError> {
        let response = self.request(Message::consume(topic)).await?;
        if response.error_reason() == Some(ErrorReason::EmptyTopic) {
            return Ok(None);
        }
        expect_kind(&response, MessageKind::Consume)?;
        Ok(Some(response))
    }

    pub async fn ack(&mut self, topic: &str, id: u64) -> Result<(), ClientError> {
        let response = self.request(Message::ack(id, topic)).await?;
        expect_kind(&response, MessageKind::Ack)
    }
}

fn expect_kind(response: &Message, expected: MessageKind) -> Result<(), ClientError> {
    match response.kind {
        kind if kind == expected => Ok(()),
        MessageKind::Error => Err(ClientError::Rejected(
            response
                .error_reason()
                .unwrap_or(ErrorReason::InvalidRequest),
        )),
        got => Err(ClientError::UnexpectedResponse { expected, got }),
    }
}
