// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test harness for end-to-end smoke tests.
//!
//! Runs a mock terminal server (WebSocket at `/`, file downloads at
//! `/download`) and either spawns the real `hostterm` binary against it or
//! drives the client library directly.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Once};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{RawQuery, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::{mpsc, Mutex};

static CRYPTO_INIT: Once = Once::new();

/// Install the ring crypto provider for reqwest/rustls.
pub fn ensure_crypto() {
    CRYPTO_INIT.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

/// Resolve the path to the compiled `hostterm` binary.
pub fn hostterm_binary() -> PathBuf {
    let manifest = Path::new(env!("CARGO_MANIFEST_DIR"));
    // tests/specs → tests → workspace root
    let workspace = manifest.parent().and_then(|p| p.parent()).unwrap_or(manifest);
    workspace.join("target").join("debug").join("hostterm")
}

// -- Mock server --------------------------------------------------------------

struct Shared {
    conns: mpsc::UnboundedSender<ServerConn>,
    files: std::sync::Mutex<HashMap<String, Vec<u8>>>,
}

/// A mock terminal server bound to a local port.
pub struct MockServer {
    addr: std::net::SocketAddr,
    shared: Arc<Shared>,
    conns: Mutex<mpsc::UnboundedReceiver<ServerConn>>,
}

impl MockServer {
    pub async fn start() -> anyhow::Result<Self> {
        let (conns_tx, conns_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared { conns: conns_tx, files: Default::default() });
        let app = Router::new()
            .route("/", get(ws_handler))
            .route("/download", get(download_handler))
            .with_state(Arc::clone(&shared));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Ok(Self { addr, shared, conns: Mutex::new(conns_rx) })
    }

    /// Base URL as passed to the client.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Serve `body` for `GET /download?{terminal}&{path}`.
    pub fn serve_file(&self, terminal: u32, path: &str, body: &[u8]) {
        if let Ok(mut files) = self.shared.files.lock() {
            files.insert(format!("{terminal}&{path}"), body.to_vec());
        }
    }

    /// Wait for the next client connection.
    pub async fn accept(&self, timeout: Duration) -> anyhow::Result<ServerConn> {
        let mut conns = self.conns.lock().await;
        tokio::time::timeout(timeout, conns.recv())
            .await?
            .ok_or_else(|| anyhow::anyhow!("mock server stopped"))
    }
}

/// Server side of one client WebSocket. Dropping it closes the socket.
pub struct ServerConn {
    tx: mpsc::UnboundedSender<String>,
    rx: mpsc::UnboundedReceiver<String>,
}

impl ServerConn {
    pub fn send(&self, msg: serde_json::Value) -> anyhow::Result<()> {
        self.tx.send(msg.to_string()).map_err(|_| anyhow::anyhow!("client socket closed"))
    }

    /// Announce a host with predictable identity fields.
    pub fn host_connected(&self, host: u32) -> anyhow::Result<()> {
        self.send(serde_json::json!({
            "type": "host_connected",
            "host_id": host,
            "host_ip": format!("10.0.0.{host}"),
            "host_user_name": "ops",
            "host_name": format!("node-{host}"),
        }))
    }

    pub fn terminal_added(&self, host: u32, terminal: u32) -> anyhow::Result<()> {
        self.send(serde_json::json!({
            "type": "terminal_added",
            "host_id": host,
            "terminal_id": terminal,
        }))
    }

    pub fn output(&self, terminal: u32, text: &str) -> anyhow::Result<()> {
        self.send(serde_json::json!({
            "type": "terminal_output",
            "terminal_id": terminal,
            "output": text,
        }))
    }

    /// Next client message, parsed.
    pub async fn recv(&mut self, timeout: Duration) -> anyhow::Result<serde_json::Value> {
        let text = tokio::time::timeout(timeout, self.rx.recv())
            .await?
            .ok_or_else(|| anyhow::anyhow!("client socket closed"))?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Skip client messages until one of type `kind` arrives.
    pub async fn recv_type(
        &mut self,
        kind: &str,
        timeout: Duration,
    ) -> anyhow::Result<serde_json::Value> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let left = deadline.saturating_duration_since(tokio::time::Instant::now());
            let msg = self.recv(left).await?;
            if msg["type"] == kind {
                return Ok(msg);
            }
        }
    }
}

async fn ws_handler(ws: WebSocketUpgrade, State(shared): State<Arc<Shared>>) -> Response {
    ws.on_upgrade(move |socket| serve_socket(socket, shared))
}

async fn serve_socket(socket: WebSocket, shared: Arc<Shared>) {
    let (to_client, mut outgoing) = mpsc::unbounded_channel::<String>();
    let (incoming, from_client) = mpsc::unbounded_channel::<String>();
    if shared.conns.send(ServerConn { tx: to_client, rx: from_client }).is_err() {
        return;
    }

    let (mut sink, mut stream) = socket.split();
    loop {
        tokio::select! {
            out = outgoing.recv() => match out {
                Some(text) => {
                    if sink.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                None => {
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
            },
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    let _ = incoming.send(text.as_str().to_owned());
                }
                Some(Ok(Message::Close(_)) | Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }
}

async fn download_handler(
    State(shared): State<Arc<Shared>>,
    RawQuery(query): RawQuery,
) -> Result<Vec<u8>, StatusCode> {
    let files = shared.files.lock().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    query.and_then(|q| files.get(&q).cloned()).ok_or(StatusCode::NOT_FOUND)
}

// -- Binary under test --------------------------------------------------------

/// A running `hostterm` process that is killed on drop.
pub struct HosttermProcess {
    child: Child,
    stdin: ChildStdin,
    stdout: ChildStdout,
    seen: Vec<u8>,
}

impl HosttermProcess {
    /// Spawn hostterm against `url` with extra CLI `args`.
    pub fn spawn(url: &str, args: &[&str]) -> anyhow::Result<Self> {
        let binary = hostterm_binary();
        anyhow::ensure!(binary.exists(), "hostterm binary not found at {}", binary.display());

        let mut child = Command::new(&binary)
            .arg(url)
            .args(["--log-level", "warn", "--max-reconnects", "0"])
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;
        let stdin = child.stdin.take().ok_or_else(|| anyhow::anyhow!("no stdin"))?;
        let stdout = child.stdout.take().ok_or_else(|| anyhow::anyhow!("no stdout"))?;
        Ok(Self { child, stdin, stdout, seen: Vec::new() })
    }

    /// Type one console line.
    pub async fn line(&mut self, text: &str) -> anyhow::Result<()> {
        self.stdin.write_all(format!("{text}\n").as_bytes()).await?;
        self.stdin.flush().await?;
        Ok(())
    }

    /// Read stdout until `needle` has appeared.
    pub async fn wait_for_output(&mut self, needle: &str, timeout: Duration) -> anyhow::Result<()> {
        let deadline = tokio::time::Instant::now() + timeout;
        let mut buf = [0u8; 4096];
        loop {
            if String::from_utf8_lossy(&self.seen).contains(needle) {
                return Ok(());
            }
            let left = deadline.saturating_duration_since(tokio::time::Instant::now());
            let n = match tokio::time::timeout(left, self.stdout.read(&mut buf)).await {
                Ok(read) => read?,
                Err(_) => anyhow::bail!(
                    "timed out waiting for {needle:?}; saw {:?}",
                    String::from_utf8_lossy(&self.seen)
                ),
            };
            anyhow::ensure!(n > 0, "stdout closed before {needle:?} appeared");
            self.seen.extend_from_slice(&buf[..n]);
        }
    }

    /// Wait for the process to exit and return its code.
    pub async fn wait_exit(&mut self, timeout: Duration) -> anyhow::Result<Option<i32>> {
        let status = tokio::time::timeout(timeout, self.child.wait()).await??;
        Ok(status.code())
    }
}

/// Spawn hostterm expecting it to exit immediately; returns its exit code.
pub async fn run_to_exit(args: &[&str], timeout: Duration) -> anyhow::Result<Option<i32>> {
    let binary = hostterm_binary();
    anyhow::ensure!(binary.exists(), "hostterm binary not found at {}", binary.display());
    let mut child = Command::new(&binary)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()?;
    let status = tokio::time::timeout(timeout, child.wait()).await??;
    Ok(status.code())
}
