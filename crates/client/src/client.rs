// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reconnecting run loop.
//!
//! Each connection gets a fresh [`App`]. When the socket goes away the
//! context is torn down (the presenter sees `disconnected`) and the loop
//! retries with exponential backoff. Nothing survives a reconnect; the
//! server resends hosts and terminals.

use std::time::Duration;

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use indexmap::IndexMap;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::app::{App, AppSettings, Intent};
use crate::console::ConsoleCommand;
use crate::error::ClientError;
use crate::protocol::{ClientMessage, TerminalId};
use crate::transport::{self, Inbound, Outbox};
use crate::view::Presenter;

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub ws_url: String,
    /// Reconnect attempts after a drop; 0 disables reconnecting.
    pub max_reconnects: u32,
    pub resize_debounce: Duration,
    pub app: AppSettings,
}

/// Input from the user side of the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Intent(Intent),
    Console(ConsoleCommand),
}

/// Why a single connection ended.
#[derive(Debug)]
enum Ended {
    Shutdown,
    /// The input side hung up.
    InputClosed,
    Lost(ClientError),
}

/// Compute reconnect backoff: 500ms * 2^attempt, capped at 10s.
pub fn reconnect_backoff(attempt: u32) -> Duration {
    let ms = 500u64.saturating_mul(1u64 << attempt.min(20));
    Duration::from_millis(ms.min(10_000))
}

/// Run until shutdown, input hang-up, or reconnects are exhausted.
///
/// Returns the presenter so the caller can inspect or reuse it.
pub async fn run<P: Presenter>(
    settings: &ClientSettings,
    mut presenter: P,
    inputs: &mut mpsc::UnboundedReceiver<Input>,
    shutdown: CancellationToken,
) -> anyhow::Result<P> {
    let mut attempt: u32 = 0;
    let mut connected_once = false;

    loop {
        let connected = tokio::select! {
            _ = shutdown.cancelled() => return Ok(presenter),
            result = transport::connect(&settings.ws_url) => result,
        };
        let ws = match connected {
            Ok(ws) => ws,
            Err(e) => {
                if !connected_once {
                    anyhow::bail!("connection failed: {e}");
                }
                if attempt >= settings.max_reconnects {
                    anyhow::bail!("max reconnects reached: {e}");
                }
                attempt += 1;
                let backoff = reconnect_backoff(attempt);
                warn!(
                    attempt,
                    max = settings.max_reconnects,
                    "connect failed, retrying in {:.1}s: {e}",
                    backoff.as_secs_f64()
                );
                if !sleep_or_cancel(backoff, &shutdown).await {
                    return Ok(presenter);
                }
                continue;
            }
        };
        info!(url = %settings.ws_url, "connected");
        connected_once = true;
        attempt = 0;

        // Intents typed against the previous connection's state are stale.
        let mut stale = 0usize;
        while inputs.try_recv().is_ok() {
            stale += 1;
        }
        if stale > 0 {
            debug!(stale, "discarded input queued while disconnected");
        }

        let (outbox, mut outbound) = Outbox::channel();
        let mut app = App::new(outbox, presenter, settings.app.clone());
        let (mut ws_tx, mut ws_rx) = ws.split();
        let ended = run_connection(
            &mut app,
            &mut ws_tx,
            &mut ws_rx,
            &mut outbound,
            inputs,
            settings.resize_debounce,
            &shutdown,
        )
        .await;

        // Best-effort close frame.
        let _ = ws_tx.send(Message::Close(None)).await;
        presenter = app.shutdown();

        match ended {
            Ended::Shutdown | Ended::InputClosed => return Ok(presenter),
            Ended::Lost(e) => {
                if settings.max_reconnects == 0 {
                    anyhow::bail!("disconnected: {e}");
                }
                attempt += 1;
                let backoff = reconnect_backoff(attempt);
                warn!(
                    attempt,
                    max = settings.max_reconnects,
                    "disconnected, reconnecting in {:.1}s: {e}",
                    backoff.as_secs_f64()
                );
                if !sleep_or_cancel(backoff, &shutdown).await {
                    return Ok(presenter);
                }
            }
        }
    }
}

/// Returns false if shutdown fired first.
async fn sleep_or_cancel(duration: Duration, shutdown: &CancellationToken) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(duration) => true,
        _ = shutdown.cancelled() => false,
    }
}

/// Inner event loop for a single WebSocket connection.
async fn run_connection<P, WsTx, WsRx>(
    app: &mut App<P>,
    ws_tx: &mut WsTx,
    ws_rx: &mut WsRx,
    outbound: &mut mpsc::UnboundedReceiver<ClientMessage>,
    inputs: &mut mpsc::UnboundedReceiver<Input>,
    resize_debounce: Duration,
    shutdown: &CancellationToken,
) -> Ended
where
    P: Presenter,
    WsTx: Sink<Message> + Unpin,
    WsRx: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    let mut resizes = ResizeDebounce::new(resize_debounce);

    loop {
        let resize_due = resizes.deadline();
        tokio::select! {
            _ = shutdown.cancelled() => return Ended::Shutdown,

            frame = ws_rx.next() => match transport::classify(frame) {
                Inbound::Message(msg) => app.handle_server(msg),
                Inbound::Skip => {}
                Inbound::Closed(e) => return Ended::Lost(e),
            },

            Some(msg) = outbound.recv() => {
                if let Err(e) = transport::send_msg(ws_tx, &msg).await {
                    if e.code.is_fatal_to_connection() {
                        return Ended::Lost(e);
                    }
                    warn!(kind = msg.kind(), "dropping outbound message: {e}");
                }
            }

            input = inputs.recv() => match input {
                Some(Input::Intent(Intent::Resize { terminal, cols, rows })) => {
                    resizes.push(terminal, cols, rows);
                }
                Some(Input::Intent(intent)) => app.handle_intent(intent),
                Some(Input::Console(cmd)) => app.handle_console(cmd),
                None => return Ended::InputClosed,
            },

            _ = async {
                match resize_due {
                    Some(at) => tokio::time::sleep_until(at).await,
                    None => std::future::pending::<()>().await,
                }
            } => {
                for (terminal, (cols, rows)) in resizes.take() {
                    app.handle_intent(Intent::Resize { terminal, cols, rows });
                }
            }
        }
    }
}

/// Coalesces resize intents until they stop arriving for `delay`.
#[derive(Debug)]
struct ResizeDebounce {
    delay: Duration,
    pending: IndexMap<TerminalId, (u16, u16)>,
    deadline: Option<Instant>,
}

impl ResizeDebounce {
    fn new(delay: Duration) -> Self {
        Self { delay, pending: IndexMap::new(), deadline: None }
    }

    fn push(&mut self, terminal: TerminalId, cols: u16, rows: u16) {
        self.pending.insert(terminal, (cols, rows));
        self.deadline = Some(Instant::now() + self.delay);
    }

    fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Latest size per terminal, in first-seen order.
    fn take(&mut self) -> Vec<(TerminalId, (u16, u16))> {
        self.deadline = None;
        self.pending.drain(..).collect()
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
