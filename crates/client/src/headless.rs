// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Line-oriented presenter and input for running without a UI.
//!
//! Terminal output of the presented session is written to the output
//! stream as raw bytes. Everything else becomes a log event or a text line.

use std::io::Write;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::bus::AppEvent;
use crate::client::Input;
use crate::console::ConsoleCommand;
use crate::download::Downloader;
use crate::host::Host;
use crate::protocol::{HostId, TerminalId};
use crate::terminal::browser::ROOT;
use crate::terminal::TerminalSession;
use crate::view::Presenter;

pub struct ConsolePresenter<W> {
    out: W,
    presented: Option<TerminalId>,
    downloader: Option<Downloader>,
}

impl<W: Write + Send + 'static> ConsolePresenter<W> {
    pub fn new(out: W, downloader: Option<Downloader>) -> Self {
        Self { out, presented: None, downloader }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write(&mut self, data: &[u8]) {
        if let Err(e) = self.out.write_all(data).and_then(|()| self.out.flush()) {
            debug!("console write failed: {e}");
        }
    }

    fn line(&mut self, text: &str) {
        self.write(format!("{text}\n").as_bytes());
    }
}

impl<W: Write + Send + 'static> Presenter for ConsolePresenter<W> {
    fn connected(&mut self) {
        info!("session context ready");
    }

    fn disconnected(&mut self) {
        self.presented = None;
        info!("all hosts dropped");
    }

    fn host_added(&mut self, host: &Host) {
        let info = host.info();
        info!(host = %info.id, "host connected: {}@{} ({})", info.user_name, info.name, info.ip);
    }

    fn host_removed(&mut self, host: HostId) {
        info!(%host, "host disconnected");
    }

    fn slots_changed(&mut self, host: &Host) {
        let states: Vec<&str> = host.slots().iter().map(|s| s.state().as_str()).collect();
        debug!(host = %host.id(), slots = ?states, "slots changed");
    }

    fn event(&mut self, event: &AppEvent) {
        match *event {
            AppEvent::TerminalClosed { host_id, terminal_id } => {
                self.line(&format!("-- terminal {terminal_id} on host {host_id} closed --"));
            }
            AppEvent::TerminalAdded { host_id, terminal_id } => {
                debug!(host = %host_id, terminal = %terminal_id, "terminal opened remotely");
            }
            AppEvent::HostSelected { host_id: Some(id) } => info!(host = %id, "host selected"),
            AppEvent::HostSelected { host_id: None } => info!("no host selected"),
            AppEvent::TerminalSelected { terminal_id } => {
                debug!(terminal = ?terminal_id, "terminal selected");
            }
        }
    }

    fn present(&mut self, session: Option<&TerminalSession>) {
        self.presented = session.map(TerminalSession::id);
        let Some(session) = session else {
            self.line("-- no terminal --");
            return;
        };
        let scrollback = session.scrollback();
        let header = match scrollback.dropped() {
            0 => format!("-- terminal {} on host {} --", session.id(), session.host_id()),
            dropped => format!(
                "-- terminal {} on host {} ({dropped} of {} bytes dropped) --",
                session.id(),
                session.host_id(),
                scrollback.total_written()
            ),
        };
        self.line(&header);
        let (head, tail) = scrollback.as_slices();
        self.write(head);
        self.write(tail);
    }

    fn output(&mut self, terminal: TerminalId, data: &[u8]) {
        if self.presented == Some(terminal) {
            self.write(data);
        }
    }

    fn show_file_browser(&mut self, terminal: TerminalId, visible: bool) {
        debug!(%terminal, visible, "file browser");
    }

    fn render_entries(&mut self, session: &TerminalSession) {
        let browser = session.browser();
        let path = browser.path().unwrap_or(ROOT).to_owned();
        let mut text = format!("-- {path} (terminal {}) --\n", session.id());
        for (index, entry) in browser.entries().iter().enumerate() {
            let marker = if entry.is_dir() { "/" } else { "" };
            let name = format!("{}{marker}", entry.name);
            let size = entry.display_size().unwrap_or_default();
            let modified = entry.display_modified().unwrap_or_default();
            let row = format!("{index:>3}  {name:<40} {size:>10}  {modified}");
            text.push_str(row.trim_end());
            text.push('\n');
        }
        self.write(text.as_bytes());
    }

    fn download(&mut self, terminal: TerminalId, path: &str) {
        let Some(downloader) = self.downloader.clone() else {
            warn!(%terminal, path, "download requested but no downloader configured");
            return;
        };
        let path = path.to_owned();
        tokio::spawn(async move {
            match downloader.fetch(terminal, &path).await {
                Ok(dest) => info!(%terminal, "downloaded {path} to {}", dest.display()),
                Err(e) => warn!(%terminal, "download of {path} failed: {e}"),
            }
        });
    }

    fn notice(&mut self, text: &str) {
        self.line(text);
    }
}

/// Forward console lines from `reader` as inputs until EOF or the
/// receiver goes away. Unparseable lines are logged and skipped.
pub async fn read_commands<R>(reader: R, tx: mpsc::UnboundedSender<Input>) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        match ConsoleCommand::parse(&line) {
            Ok(cmd) => {
                if tx.send(Input::Console(cmd)).is_err() {
                    break;
                }
            }
            Err(e) => warn!("{e}"),
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "headless_tests.rs"]
mod tests;
