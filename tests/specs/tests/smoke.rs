// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end smoke tests against a mock terminal server, both through the
//! real `hostterm` binary and through the client library.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use hostterm::app::{AppSettings, Intent};
use hostterm::client::{self, ClientSettings, Input};
use hostterm::protocol::TerminalId;
use hostterm::test_support::{Recorded, RecordingPresenter};
use hostterm_specs::{ensure_crypto, run_to_exit, HosttermProcess, MockServer};

const TIMEOUT: Duration = Duration::from_secs(10);

// -- Binary -------------------------------------------------------------------

#[tokio::test]
async fn binary_streams_output_and_keys() -> anyhow::Result<()> {
    let server = MockServer::start().await?;
    let mut term = HosttermProcess::spawn(&server.url(), &["--auto-open"])?;
    let mut conn = server.accept(TIMEOUT).await?;

    conn.host_connected(1)?;
    let req = conn.recv_type("terminal_req", TIMEOUT).await?;
    assert_eq!(req["remote_host_id"], 1);

    conn.terminal_added(1, 3)?;
    conn.output(3, "smoke-marker\r\n")?;
    term.wait_for_output("-- terminal 3 on host 1 --", TIMEOUT).await?;
    term.wait_for_output("smoke-marker", TIMEOUT).await?;

    term.line("uptime").await?;
    let key = conn.recv_type("terminal_key", TIMEOUT).await?;
    assert_eq!(key["terminal_id"], 3);
    assert_eq!(key["key"], "uptime\r");
    Ok(())
}

#[tokio::test]
async fn binary_lists_hosts() -> anyhow::Result<()> {
    let server = MockServer::start().await?;
    let mut term = HosttermProcess::spawn(&server.url(), &[])?;
    let conn = server.accept(TIMEOUT).await?;

    conn.host_connected(1)?;
    conn.host_connected(2)?;
    conn.terminal_added(1, 1)?;
    term.wait_for_output("-- terminal 1 on host 1 --", TIMEOUT).await?;

    term.line(":hosts").await?;
    term.wait_for_output("* 1 ops@node-1 (10.0.0.1)  [1]>terminal:1  [2]idle", TIMEOUT).await?;
    term.wait_for_output("  2 ops@node-2 (10.0.0.2)  [1]idle", TIMEOUT).await?;
    Ok(())
}

#[tokio::test]
async fn binary_browses_and_downloads() -> anyhow::Result<()> {
    ensure_crypto();
    let server = MockServer::start().await?;
    let dir = tempfile::tempdir()?;
    let dir_arg = dir.path().to_string_lossy().into_owned();
    let mut term = HosttermProcess::spawn(&server.url(), &["--download-dir", &dir_arg])?;
    let mut conn = server.accept(TIMEOUT).await?;

    conn.host_connected(1)?;
    conn.terminal_added(1, 4)?;
    term.wait_for_output("-- terminal 4 on host 1 --", TIMEOUT).await?;

    term.line(":files").await?;
    let req = conn.recv_type("file_req", TIMEOUT).await?;
    assert_eq!(req["terminal_id"], 4);
    assert_eq!(req["path"], "/");
    assert_eq!(req["list"], true);

    conn.send(serde_json::json!({
        "type": "directory_listing_received",
        "terminal_id": 4,
        "req_path": "/srv",
        "files": [
            { "name": "data", "is_dir": true },
            { "name": "report.csv", "size": 8, "last_mod": 1700000000 },
        ],
    }))?;
    term.wait_for_output("-- /srv (terminal 4) --", TIMEOUT).await?;
    term.wait_for_output("report.csv", TIMEOUT).await?;

    term.line(":open data").await?;
    let req = conn.recv_type("file_req", TIMEOUT).await?;
    assert_eq!(req["path"], "/srv/data");

    server.serve_file(4, "/srv/report.csv", b"a,b\n1,2\n");
    term.line(":open report.csv").await?;
    let dest = dir.path().join("report.csv");
    let deadline = tokio::time::Instant::now() + TIMEOUT;
    while !dest.exists() {
        anyhow::ensure!(tokio::time::Instant::now() < deadline, "download never landed");
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    // The file may still be mid-write on the first sighting.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(std::fs::read_to_string(&dest)?, "a,b\n1,2\n");
    Ok(())
}

#[tokio::test]
async fn binary_rejects_bad_url() -> anyhow::Result<()> {
    assert_eq!(run_to_exit(&["ftp://host"], TIMEOUT).await?, Some(2));
    Ok(())
}

#[tokio::test]
async fn binary_fails_when_server_unreachable() -> anyhow::Result<()> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    let url = format!("http://{}", listener.local_addr()?);
    drop(listener);
    assert_eq!(run_to_exit(&[&url], TIMEOUT).await?, Some(1));
    Ok(())
}

// -- Library ------------------------------------------------------------------

async fn wait_for(
    calls: &mut mpsc::UnboundedReceiver<Recorded>,
    want: &Recorded,
) -> anyhow::Result<()> {
    let deadline = tokio::time::Instant::now() + TIMEOUT;
    loop {
        let left = deadline.saturating_duration_since(tokio::time::Instant::now());
        match tokio::time::timeout(left, calls.recv()).await? {
            Some(call) if &call == want => return Ok(()),
            Some(_) => {}
            None => anyhow::bail!("presenter dropped before {want:?}"),
        }
    }
}

#[tokio::test]
async fn reconnect_builds_fresh_context() -> anyhow::Result<()> {
    let server = MockServer::start().await?;
    let settings = ClientSettings {
        ws_url: hostterm::transport::ws_url(&server.url()),
        max_reconnects: 3,
        resize_debounce: Duration::from_millis(10),
        app: AppSettings::default(),
    };
    let (presenter, mut calls) = RecordingPresenter::with_notify();
    let (inputs_tx, mut inputs) = mpsc::unbounded_channel();
    let shutdown = CancellationToken::new();
    let task = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move { client::run(&settings, presenter, &mut inputs, shutdown).await })
    };

    let conn = server.accept(TIMEOUT).await?;
    wait_for(&mut calls, &Recorded::Connected).await?;
    conn.host_connected(1)?;
    conn.terminal_added(1, 7)?;
    wait_for(&mut calls, &Recorded::Present(Some(TerminalId(7)), vec![])).await?;

    drop(conn);
    wait_for(&mut calls, &Recorded::Disconnected).await?;

    let mut conn = server.accept(TIMEOUT).await?;
    wait_for(&mut calls, &Recorded::Connected).await?;

    // Terminal 7 belonged to the old context and is not resent.
    inputs_tx.send(Input::Intent(Intent::Key { terminal: TerminalId(7), data: "stale".into() }))?;
    conn.host_connected(1)?;
    conn.terminal_added(1, 8)?;
    wait_for(&mut calls, &Recorded::Present(Some(TerminalId(8)), vec![])).await?;
    inputs_tx.send(Input::Intent(Intent::Key { terminal: TerminalId(8), data: "ls\r".into() }))?;

    let key = conn.recv_type("terminal_key", TIMEOUT).await?;
    assert_eq!(key["terminal_id"], 8);
    assert_eq!(key["key"], "ls\r");

    shutdown.cancel();
    let presenter = tokio::time::timeout(TIMEOUT, task).await???;
    assert_eq!(presenter.snapshot().last(), Some(&Recorded::Disconnected));
    Ok(())
}

#[tokio::test]
async fn server_close_of_presented_terminal_moves_view() -> anyhow::Result<()> {
    let server = MockServer::start().await?;
    let settings = ClientSettings {
        ws_url: hostterm::transport::ws_url(&server.url()),
        max_reconnects: 0,
        resize_debounce: Duration::from_millis(10),
        app: AppSettings::default(),
    };
    let (presenter, mut calls) = RecordingPresenter::with_notify();
    let (_inputs_tx, mut inputs) = mpsc::unbounded_channel();
    let shutdown = CancellationToken::new();
    let task = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move { client::run(&settings, presenter, &mut inputs, shutdown).await })
    };

    let mut conn = server.accept(TIMEOUT).await?;
    conn.host_connected(1)?;
    conn.terminal_added(1, 1)?;
    conn.terminal_added(1, 2)?;
    conn.output(2, "two")?;
    wait_for(&mut calls, &Recorded::Present(Some(TerminalId(1)), vec![])).await?;

    conn.send(serde_json::json!({ "type": "terminal_closed", "terminal_id": 1 }))?;
    wait_for(&mut calls, &Recorded::Present(Some(TerminalId(2)), b"two".to_vec())).await?;

    // A server-initiated close is not echoed back.
    conn.send(serde_json::json!({ "type": "terminal_closed", "host_id": 1, "terminal_id": 2 }))?;
    wait_for(&mut calls, &Recorded::Present(None, vec![])).await?;
    assert!(conn.recv(Duration::from_millis(200)).await.is_err());

    shutdown.cancel();
    tokio::time::timeout(TIMEOUT, task).await???;
    Ok(())
}
