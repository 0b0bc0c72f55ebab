// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test infrastructure: a recording presenter and assertion helpers.

use std::sync::{Arc, Once};

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::app::{App, AppSettings, Intent};
use crate::bus::{AppEvent, Delivery};
use crate::host::{Host, SlotId, SlotState};
use crate::protocol::{ClientMessage, HostId, ServerMessage, TerminalId};
use crate::terminal::TerminalSession;
use crate::transport::Outbox;
use crate::view::Presenter;

/// One presenter call, flattened to owned data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recorded {
    Connected,
    Disconnected,
    HostAdded(HostId),
    HostRemoved(HostId),
    SlotsChanged(HostId, Vec<SlotState>),
    Event(AppEvent),
    /// Presented session and the scrollback it was replayed with.
    Present(Option<TerminalId>, Vec<u8>),
    Output(TerminalId, Vec<u8>),
    FileBrowser(TerminalId, bool),
    /// Entry names in display order.
    Entries(TerminalId, Vec<String>),
    Download(TerminalId, String),
    Notice(String),
}

/// Presenter that records every call. Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct RecordingPresenter {
    log: Arc<Mutex<Vec<Recorded>>>,
    notify: Option<mpsc::UnboundedSender<Recorded>>,
}

impl RecordingPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also stream every recorded call, for tests that await them.
    pub fn with_notify() -> (Self, mpsc::UnboundedReceiver<Recorded>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { log: Arc::default(), notify: Some(tx) }, rx)
    }

    /// Drain the log.
    pub fn take(&self) -> Vec<Recorded> {
        std::mem::take(&mut *self.log.lock())
    }

    pub fn snapshot(&self) -> Vec<Recorded> {
        self.log.lock().clone()
    }

    fn record(&self, entry: Recorded) {
        if let Some(ref tx) = self.notify {
            let _ = tx.send(entry.clone());
        }
        self.log.lock().push(entry);
    }
}

impl Presenter for RecordingPresenter {
    fn connected(&mut self) {
        self.record(Recorded::Connected);
    }

    fn disconnected(&mut self) {
        self.record(Recorded::Disconnected);
    }

    fn host_added(&mut self, host: &Host) {
        self.record(Recorded::HostAdded(host.id()));
    }

    fn host_removed(&mut self, host: HostId) {
        self.record(Recorded::HostRemoved(host));
    }

    fn slots_changed(&mut self, host: &Host) {
        let states = host.slots().iter().map(|s| s.state()).collect();
        self.record(Recorded::SlotsChanged(host.id(), states));
    }

    fn event(&mut self, event: &AppEvent) {
        self.record(Recorded::Event(event.clone()));
    }

    fn present(&mut self, session: Option<&TerminalSession>) {
        let replay = session.map(|s| s.scrollback().to_vec()).unwrap_or_default();
        self.record(Recorded::Present(session.map(TerminalSession::id), replay));
    }

    fn output(&mut self, terminal: TerminalId, data: &[u8]) {
        self.record(Recorded::Output(terminal, data.to_vec()));
    }

    fn show_file_browser(&mut self, terminal: TerminalId, visible: bool) {
        self.record(Recorded::FileBrowser(terminal, visible));
    }

    fn render_entries(&mut self, session: &TerminalSession) {
        let names = session.browser().entries().iter().map(|e| e.name.clone()).collect();
        self.record(Recorded::Entries(session.id(), names));
    }

    fn download(&mut self, terminal: TerminalId, path: &str) {
        self.record(Recorded::Download(terminal, path.to_owned()));
    }

    fn notice(&mut self, text: &str) {
        self.record(Recorded::Notice(text.to_owned()));
    }
}

/// An [`App`] wired to a recording presenter, a drained outbox, and an
/// event recorder.
pub struct AppHarness {
    pub app: App<RecordingPresenter>,
    pub presenter: RecordingPresenter,
    outbound: mpsc::UnboundedReceiver<ClientMessage>,
    events: Arc<Mutex<Vec<AppEvent>>>,
}

impl AppHarness {
    pub fn new(settings: AppSettings) -> Self {
        let (outbox, outbound) = Outbox::channel();
        let presenter = RecordingPresenter::new();
        let mut app = App::new(outbox, presenter.clone(), settings);
        let events: Arc<Mutex<Vec<AppEvent>>> = Arc::default();
        let sink = Arc::clone(&events);
        app.bus_mut().subscribe(move |event| {
            sink.lock().push(event.clone());
            Delivery::Keep
        });
        presenter.take();
        Self { app, presenter, outbound, events }
    }

    pub fn server(&mut self, msg: ServerMessage) {
        self.app.handle_server(msg);
    }

    pub fn intent(&mut self, intent: Intent) {
        self.app.handle_intent(intent);
    }

    pub fn connect_host(&mut self, id: u32) {
        self.server(ServerMessage::HostConnected {
            host_id: HostId(id),
            host_ip: format!("10.0.0.{id}"),
            host_user_name: "ops".to_owned(),
            host_name: format!("node-{id}"),
        });
    }

    pub fn terminal_added(&mut self, host: u32, terminal: u32) {
        self.server(ServerMessage::TerminalAdded {
            host_id: HostId(host),
            terminal_id: TerminalId(terminal),
        });
    }

    /// Requests queued since the last call.
    pub fn sent(&mut self) -> Vec<ClientMessage> {
        let mut out = Vec::new();
        while let Ok(msg) = self.outbound.try_recv() {
            out.push(msg);
        }
        out
    }

    /// Bus events published since the last call.
    pub fn events(&self) -> Vec<AppEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    pub fn slot_states(&self, host: u32) -> Vec<SlotState> {
        self.app
            .hosts()
            .get(HostId(host))
            .map(|h| h.slots().iter().map(|s| s.state()).collect())
            .unwrap_or_default()
    }

    /// Id of the n-th slot (0-based) of a host.
    pub fn slot(&self, host: u32, index: usize) -> Option<SlotId> {
        self.app.hosts().get(HostId(host)).and_then(|h| h.slots().get(index)).map(|s| s.id())
    }
}

static CRYPTO_INIT: Once = Once::new();

/// Install the ring crypto provider for reqwest/rustls.
/// Safe to call multiple times; only the first call has effect.
pub fn ensure_crypto() {
    CRYPTO_INIT.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

/// Extension trait to convert any `Display` error into `anyhow::Error`.
/// Replaces `.map_err(|e| anyhow::anyhow!("{e}"))` with `.anyhow()`.
pub trait AnyhowExt<T> {
    fn anyhow(self) -> anyhow::Result<T>;
}

impl<T, E: std::fmt::Display> AnyhowExt<T> for Result<T, E> {
    fn anyhow(self) -> anyhow::Result<T> {
        self.map_err(|e| anyhow::anyhow!("{e}"))
    }
}

/// Assert that an expression evaluates to `Err` whose Display output
/// contains the given substring.
#[macro_export]
macro_rules! assert_err_contains {
    ($expr:expr, $substr:expr) => {{
        let result = $expr;
        let err = result.expect_err(concat!("expected Err for: ", stringify!($expr)));
        let msg = err.to_string();
        assert!(msg.contains($substr), "expected error containing {:?}, got: {msg:?}", $substr);
    }};
}
