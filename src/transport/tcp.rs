//! TCP transport
//!
//! This file implements the TCP server that feeds decoded frames to the
//! dispatcher. Responsibilities:
//! - Accept TCP connections and spawn one task per connection
//! - Read one frame, dispatch it, write one frame back, repeat until the
//!   peer closes the connection
//! - Answer an undecodable frame with a `malformed_frame` error and close,
//!   since the byte stream cannot be resynchronized afterwards
//!
//! No broker lock is held while a task waits on the socket: the dispatcher
//! returns an owned response before the write begins.

use std::io;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use crate::broker::Dispatcher;
use crate::protocol::{ErrorReason, Message, MessageCodec};

pub async fn start_tcp_server(
    addr: String,
    dispatcher: Dispatcher,
    shutdown: CancellationToken,
) -> io::Result<()> {
    let listener = TcpListener::bind(&addr).await?;
    info!("popmq listening on tcp://{}", listener.local_addr()?);
    serve(listener, dispatcher, shutdown).await;
    Ok(())
}

/// Accept connections on `listener` until `shutdown` fires.
pub async fn serve(listener: TcpListener, dispatcher: Dispatcher, shutdown: CancellationToken) {
    loop {
        let (stream, peer) = tokio::select! {
            _ = shutdown.cancelled() => {
                info!("listener stopping");
                break;
            }
            accepted = listener.accept() => match accepted {
                Ok(conn) => conn,
                Err(e) => {
                    warn!("accept failed: {e}");
                    continue;
                }
            },
        };

        let dispatcher = dispatcher.clone();
        let shutdown = shutdown.clone();
        let conn_id = format!("conn-{}", Uuid::new_v4());
        let span = info_span!("connection", %conn_id, %peer);

        tokio::spawn(
            async move {
                debug!("connection opened");
                handle_connection(stream, &dispatcher, &shutdown).await;
                debug!("connection closed");
            }
            .instrument(span),
        );
    }
}

/// Serve request/response cycles on one connection until the peer closes,
/// a frame cannot be decoded, or `shutdown` fires.
pub async fn handle_connection<S>(stream: S, dispatcher: &Dispatcher, shutdown: &CancellationToken)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut frames = Framed::new(stream, MessageCodec);

    loop {
        let next = tokio::select! {
            _ = shutdown.cancelled() => break,
            next = frames.next() => next,
        };

        let response = match next {
            None => break,
            Some(Ok(request)) => dispatcher.dispatch(request),
            Some(Err(e)) => {
                warn!("malformed frame: {e}");
                let reply = Message::error(0, "", ErrorReason::MalformedFrame);
                if let Err(e) = frames.send(reply).await {
                    debug!("could not report malformed frame: {e}");
                }
                break;
            }
        };

        if let Err(e) = frames.send(response).await {
            warn!("failed to write response: {e}");
            break;
        }
    }
}
