// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket transport to the terminal server.
//!
//! Only the connection loop writes to the socket. Everything else queues
//! requests on an [`Outbox`], the single send entry point.

use futures_util::{Sink, SinkExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::debug;

use crate::error::{ClientError, ErrorCode};
use crate::protocol::{self, ClientMessage, ServerMessage};

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Queue of outbound requests drained by the connection loop.
#[derive(Debug, Clone)]
pub struct Outbox {
    tx: mpsc::UnboundedSender<ClientMessage>,
}

impl Outbox {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ClientMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Queue a request. Returns false once the connection is gone.
    pub fn send(&self, msg: ClientMessage) -> bool {
        match self.tx.send(msg) {
            Ok(()) => true,
            Err(e) => {
                debug!(kind = e.0.kind(), "outbox closed, dropping request");
                false
            }
        }
    }
}

pub async fn connect(url: &str) -> Result<WsStream, ClientError> {
    let (stream, _response) = tokio_tungstenite::connect_async(url)
        .await
        .map_err(|e| ErrorCode::Disconnected.to_error(format!("{url}: {e}")))?;
    Ok(stream)
}

/// Encode and write one request.
pub async fn send_msg<S>(tx: &mut S, msg: &ClientMessage) -> Result<(), ClientError>
where
    S: Sink<Message> + Unpin,
{
    let text = protocol::encode(msg)?;
    tx.send(Message::Text(text.into()))
        .await
        .map_err(|_| ErrorCode::SendFailed.to_error(format!("{} not sent", msg.kind())))
}

/// What an inbound frame means to the connection loop.
#[derive(Debug)]
pub enum Inbound {
    Message(ServerMessage),
    /// Control frames, binary frames, and undecodable text.
    Skip,
    Closed(ClientError),
}

/// Classify the next item read from the socket.
///
/// Malformed and unknown messages are logged and skipped; they never end
/// the connection.
pub fn classify(frame: Option<Result<Message, tungstenite::Error>>) -> Inbound {
    match frame {
        Some(Ok(Message::Text(text))) => match protocol::decode(text.as_str()) {
            Ok(msg) => Inbound::Message(msg),
            Err(e) => {
                debug!(code = %e.code, "dropping inbound frame: {}", e.message);
                Inbound::Skip
            }
        },
        Some(Ok(Message::Close(frame))) => {
            let reason = frame.map(|f| f.reason.to_string()).unwrap_or_default();
            Inbound::Closed(ErrorCode::Disconnected.to_error(format!("closed by server {reason}")))
        }
        Some(Ok(_)) => Inbound::Skip,
        Some(Err(e)) => Inbound::Closed(ErrorCode::Disconnected.to_error(e.to_string())),
        None => Inbound::Closed(ErrorCode::Disconnected.to_error("connection closed")),
    }
}

/// Convert an `http(s)` base URL to the server's WebSocket endpoint.
pub fn ws_url(base: &str) -> String {
    let base = base.trim_end_matches('/');
    if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}/")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}/")
    } else if base.starts_with("ws://") || base.starts_with("wss://") {
        format!("{base}/")
    } else {
        format!("ws://{base}/")
    }
}

#[cfg(test)]
#[path = "transport_tests.rs"]
mod tests;
