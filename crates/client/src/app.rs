// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Application context for one live connection.
//!
//! [`App`] owns the host registry, the session registry, the view selector
//! and the event bus, and is the only thing that mutates them. Server
//! messages and user intents are each applied to completion before the
//! next one is looked at. A fresh context is built for every connection
//! and dropped when it is lost.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::bus::{AppEvent, Delivery, EventBus, SubscriberId};
use crate::console::{self, ConsoleCommand};
use crate::host::{AttachOutcome, HostInfo, HostRegistry, SelectOutcome, SlotId, SlotView};
use crate::protocol::{ClientMessage, HostId, ServerMessage, TerminalId, WireEntry};
use crate::terminal::browser::{self, Navigation, ROOT};
use crate::terminal::{SessionRegistry, DEFAULT_SCROLLBACK};
use crate::transport::Outbox;
use crate::view::{ActiveView, Presenter};

/// Behavior knobs for the application context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppSettings {
    /// Request a terminal automatically for the first host and for any
    /// selected host without one.
    pub auto_open: bool,
    pub max_sessions: usize,
    pub scrollback: usize,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            auto_open: false,
            max_sessions: crate::host::DEFAULT_MAX_SESSIONS,
            scrollback: DEFAULT_SCROLLBACK,
        }
    }
}

/// A user action from the rendering collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    SelectHost(HostId),
    /// Click on a host's add affordance.
    AddTerminal(HostId),
    /// Click on a slot: select it, or toggle its file browser if selected.
    SelectSlot { host: HostId, slot: SlotId },
    CloseSlot { host: HostId, slot: SlotId },
    Key { terminal: TerminalId, data: String },
    Resize { terminal: TerminalId, cols: u16, rows: u16 },
    /// Click on a file-browser entry by display index.
    OpenEntry { terminal: TerminalId, index: usize },
    ListDirectory { terminal: TerminalId, path: String },
}

/// Who asked for a session to go away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Client,
    Server,
}

pub struct App<P: Presenter> {
    hosts: HostRegistry,
    sessions: SessionRegistry,
    view: ActiveView,
    bus: EventBus,
    /// The presenter's bus subscription and the events it has received.
    presenter_sub: SubscriberId,
    presenter_inbox: Arc<Mutex<Vec<AppEvent>>>,
    /// Subscriber whose intent is being applied. Its own events skip it.
    publisher: Option<SubscriberId>,
    outbox: Outbox,
    presenter: P,
    settings: AppSettings,
    /// Last size sent per terminal.
    sizes: HashMap<TerminalId, (u16, u16)>,
}

impl<P: Presenter> App<P> {
    /// Build a context for a connection that just came up.
    pub fn new(outbox: Outbox, mut presenter: P, settings: AppSettings) -> Self {
        presenter.connected();
        let mut bus = EventBus::new();
        let presenter_inbox: Arc<Mutex<Vec<AppEvent>>> = Arc::default();
        let sink = Arc::clone(&presenter_inbox);
        let presenter_sub = bus.subscribe(move |event| {
            sink.lock().push(event.clone());
            Delivery::Keep
        });
        Self {
            hosts: HostRegistry::new(settings.max_sessions),
            sessions: SessionRegistry::new(settings.scrollback),
            view: ActiveView::default(),
            bus,
            presenter_sub,
            presenter_inbox,
            publisher: None,
            outbox,
            presenter,
            settings,
            sizes: HashMap::new(),
        }
    }

    pub fn hosts(&self) -> &HostRegistry {
        &self.hosts
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    /// The presented terminal.
    pub fn active_terminal(&self) -> Option<TerminalId> {
        self.view.current()
    }

    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn bus_mut(&mut self) -> &mut EventBus {
        &mut self.bus
    }

    /// Wipe all state after transport loss and hand the presenter back.
    pub fn shutdown(mut self) -> P {
        info!(
            hosts = self.hosts.len(),
            sessions = self.sessions.len(),
            "connection lost, clearing state"
        );
        self.view.reset();
        self.sessions.clear();
        self.hosts.clear();
        self.sizes.clear();
        self.presenter.disconnected();
        self.presenter
    }

    // -- Server events -------------------------------------------------------

    pub fn handle_server(&mut self, msg: ServerMessage) {
        match msg {
            ServerMessage::HostConnected { host_id, host_ip, host_user_name, host_name } => {
                let info = HostInfo {
                    id: host_id,
                    ip: host_ip,
                    user_name: host_user_name,
                    name: host_name,
                };
                self.add_host(info);
            }
            ServerMessage::HostDisconnected { host_id } => self.remove_host(host_id),
            ServerMessage::TerminalAdded { host_id, terminal_id } => {
                self.attach_terminal(host_id, terminal_id);
            }
            ServerMessage::TerminalOutput { terminal_id, output } => {
                let data = output.into_bytes();
                if !self.sessions.append_output(terminal_id, &data) {
                    debug!(terminal = %terminal_id, "output for unknown terminal");
                    return;
                }
                if self.view.current() == Some(terminal_id) {
                    self.presenter.output(terminal_id, &data);
                }
            }
            ServerMessage::TerminalClosed { host_id, terminal_id } => {
                self.terminal_closed(host_id, terminal_id);
            }
            ServerMessage::DirectoryListingReceived { terminal_id, req_path, files } => {
                self.directory_listing(terminal_id, &req_path, files);
            }
        }
    }

    fn add_host(&mut self, info: HostInfo) {
        let id = info.id;
        let previous = self.hosts.current();
        if !self.hosts.add_host(info) {
            debug!(host = %id, "host already connected");
            return;
        }
        if let Some(host) = self.hosts.get(id) {
            info!(host = %id, name = %host.info().name, ip = %host.info().ip, "host connected");
            self.presenter.host_added(host);
        }
        if self.hosts.current() != previous {
            self.publish_host_selected();
        }
        if self.settings.auto_open && self.hosts.len() == 1 {
            self.request_terminal(id);
        }
    }

    fn remove_host(&mut self, id: HostId) {
        let Some(removed) = self.hosts.remove_host(id) else {
            debug!(host = %id, "disconnect for unknown host");
            return;
        };
        info!(host = %id, terminals = removed.terminals.len(), "host disconnected");

        // The view can no longer resolve into this host; clear it before
        // the sessions go.
        self.refresh_view();
        for terminal in removed.terminals {
            self.outbox.send(ClientMessage::TerminalDel { terminal_id: terminal });
            self.sessions.destroy(terminal);
            self.sizes.remove(&terminal);
            self.publish(AppEvent::TerminalClosed { host_id: id, terminal_id: terminal });
        }
        self.presenter.host_removed(id);
        if removed.was_current {
            self.publish_host_selected();
        }
    }

    fn attach_terminal(&mut self, host_id: HostId, terminal: TerminalId) {
        if self.sessions.contains(terminal) {
            debug!(host = %host_id, terminal = %terminal, "terminal already known");
            return;
        }
        let previous = self.hosts.current();
        let (requested, selected) = match self.hosts.attach_terminal(host_id, terminal) {
            AttachOutcome::Bound { requested, selected, .. } => (requested, selected),
            AttachOutcome::UnknownHost => {
                debug!(host = %host_id, terminal = %terminal, "terminal for unknown host");
                return;
            }
            AttachOutcome::Duplicate => {
                debug!(host = %host_id, terminal = %terminal, "terminal already bound");
                return;
            }
            AttachOutcome::AtCapacity => {
                warn!(host = %host_id, terminal = %terminal, "host at terminal cap, closing");
                self.outbox.send(ClientMessage::TerminalDel { terminal_id: terminal });
                return;
            }
        };
        self.sessions.create(terminal, host_id);
        info!(host = %host_id, terminal = %terminal, "terminal added");
        self.publish(AppEvent::TerminalAdded { host_id, terminal_id: terminal });

        if let Some(host) = self.hosts.get(host_id) {
            self.presenter.slots_changed(host);
        }
        if requested || self.hosts.current() != previous {
            self.publish_host_selected();
        }
        if selected {
            self.refresh_view();
        }
    }

    fn terminal_closed(&mut self, host_id: Option<HostId>, terminal: TerminalId) {
        match self.hosts.locate(terminal) {
            Some((owner, slot)) => {
                if host_id.is_some_and(|h| h != owner) {
                    debug!(terminal = %terminal, owner = %owner, "close names a different host");
                }
                self.close_slot(owner, slot, Origin::Server);
            }
            None => {
                // Already torn down locally, or never bound.
                self.sessions.destroy(terminal);
                self.sizes.remove(&terminal);
                debug!(terminal = %terminal, "close for unknown terminal");
            }
        }
    }

    fn directory_listing(&mut self, terminal: TerminalId, path: &str, files: Vec<WireEntry>) {
        if !self.sessions.set_directory_listing(terminal, path, files) {
            debug!(terminal = %terminal, "listing for unknown terminal");
            return;
        }
        if let Some(session) = self.sessions.get(terminal) {
            self.presenter.render_entries(session);
        }
    }

    // -- User intents --------------------------------------------------------

    /// Apply a user intent. The presenter issued it, so the events it
    /// causes are not echoed back to the presenter's subscription.
    pub fn handle_intent(&mut self, intent: Intent) {
        let outer = self.publisher.replace(self.presenter_sub);
        self.apply_intent(intent);
        self.publisher = outer;
    }

    fn apply_intent(&mut self, intent: Intent) {
        match intent {
            Intent::SelectHost(host) => self.select_host(host),
            Intent::AddTerminal(host) => self.request_terminal(host),
            Intent::SelectSlot { host, slot } => self.select_slot(host, slot),
            Intent::CloseSlot { host, slot } => self.close_slot(host, slot, Origin::Client),
            Intent::Key { terminal, data } => {
                if self.sessions.contains(terminal) {
                    let key = ClientMessage::TerminalKey { terminal_id: terminal, key: data };
                    self.outbox.send(key);
                } else {
                    debug!(terminal = %terminal, "keys for unknown terminal");
                }
            }
            Intent::Resize { terminal, cols, rows } => self.resize(terminal, cols, rows),
            Intent::OpenEntry { terminal, index } => self.open_entry(terminal, index),
            Intent::ListDirectory { terminal, path } => self.list_directory(terminal, &path),
        }
    }

    /// Resolve and apply a console command against the current state.
    pub fn handle_console(&mut self, cmd: ConsoleCommand) {
        match console::resolve(self, cmd) {
            Ok(console::Resolved::Intent(intent)) => self.handle_intent(intent),
            Ok(console::Resolved::Reply(text)) => self.presenter.notice(&text),
            Err(e) => self.presenter.notice(&e.to_string()),
        }
    }

    fn select_host(&mut self, host: HostId) {
        let previous = self.hosts.current();
        if !self.hosts.select_host(host) {
            debug!(host = %host, "select of unknown host");
            return;
        }
        if previous != Some(host) {
            self.publish_host_selected();
        }
        self.refresh_view();
        let empty = self.hosts.get(host).is_some_and(|h| h.session_count() == 0);
        if self.settings.auto_open && empty {
            self.request_terminal(host);
        }
    }

    fn request_terminal(&mut self, host: HostId) {
        if self.hosts.request_new_terminal(host).is_none() {
            debug!(host = %host, "new terminal request rejected");
            return;
        }
        self.outbox.send(ClientMessage::TerminalReq { remote_host_id: host });
        if let Some(h) = self.hosts.get(host) {
            self.presenter.slots_changed(h);
        }
    }

    fn select_slot(&mut self, host: HostId, slot: SlotId) {
        match self.hosts.select_slot(host, slot) {
            SelectOutcome::Selected { .. } => {
                if let Some(h) = self.hosts.get(host) {
                    self.presenter.slots_changed(h);
                }
                self.publish_host_selected();
                self.refresh_view();
            }
            SelectOutcome::Toggled { terminal, view } => {
                if let Some(h) = self.hosts.get(host) {
                    self.presenter.slots_changed(h);
                }
                let visible = view == SlotView::FileList;
                self.presenter.show_file_browser(terminal, visible);
                if visible {
                    self.show_listing(terminal);
                }
            }
            SelectOutcome::Ignored => debug!(host = %host, slot = %slot, "slot selection ignored"),
        }
    }

    /// Render the cached listing, or fetch the root on first open.
    fn show_listing(&mut self, terminal: TerminalId) {
        let Some(session) = self.sessions.get(terminal) else {
            return;
        };
        if session.browser().has_listing() {
            self.presenter.render_entries(session);
        } else {
            let path = ROOT.to_owned();
            let req = ClientMessage::FileReq { terminal_id: terminal, path, list: true };
            self.outbox.send(req);
        }
    }

    /// Shared teardown for client- and server-initiated closes.
    fn close_slot(&mut self, host: HostId, slot: SlotId, origin: Origin) {
        let Some(closed) = self.hosts.close_slot(host, slot) else {
            debug!(host = %host, slot = %slot, "close of unknown or unbound slot");
            return;
        };
        let terminal = closed.terminal;
        info!(host = %host, terminal = %terminal, ?origin, "terminal closed");
        if closed.host_empty {
            debug!(host = %host, "host has no terminals left");
        }

        // Move the view off the session before destroying it.
        self.refresh_view();
        if origin == Origin::Client {
            self.outbox.send(ClientMessage::TerminalDel { terminal_id: terminal });
        }
        self.sessions.destroy(terminal);
        self.sizes.remove(&terminal);
        self.publish(AppEvent::TerminalClosed { host_id: host, terminal_id: terminal });
        if let Some(h) = self.hosts.get(host) {
            self.presenter.slots_changed(h);
        }
    }

    fn resize(&mut self, terminal: TerminalId, cols: u16, rows: u16) {
        if !self.sessions.contains(terminal) {
            debug!(terminal = %terminal, "resize for unknown terminal");
            return;
        }
        if self.sizes.get(&terminal) == Some(&(cols, rows)) {
            return;
        }
        self.sizes.insert(terminal, (cols, rows));
        let resize =
            ClientMessage::TerminalResize { terminal_id: terminal, width: cols, height: rows };
        self.outbox.send(resize);
    }

    fn open_entry(&mut self, terminal: TerminalId, index: usize) {
        let target = self.sessions.get(terminal).and_then(|s| s.browser().navigate(index));
        match target {
            Some(Navigation::List(path)) => {
                let req = ClientMessage::FileReq { terminal_id: terminal, path, list: true };
                self.outbox.send(req);
            }
            Some(Navigation::Download(path)) => {
                info!(terminal = %terminal, path = %path, "download requested");
                self.presenter.download(terminal, &path);
            }
            None => debug!(terminal = %terminal, index, "no such entry"),
        }
    }

    fn list_directory(&mut self, terminal: TerminalId, path: &str) {
        if !self.sessions.contains(terminal) {
            debug!(terminal = %terminal, "listing request for unknown terminal");
            return;
        }
        let path = match self.sessions.get(terminal).and_then(|s| s.browser().path()) {
            Some(base) if !path.starts_with('/') => browser::join_path(base, path),
            _ => browser::normalize(path),
        };
        self.outbox.send(ClientMessage::FileReq { terminal_id: terminal, path, list: true });
    }

    // -- Selection -----------------------------------------------------------

    /// Present the current host's selected terminal.
    fn refresh_view(&mut self) {
        let target = self.hosts.active_terminal();
        let session = target.and_then(|t| self.sessions.get(t));
        if !self.view.present(&mut self.presenter, session) {
            return;
        }
        let current = self.view.current();
        if let Some(terminal) = current {
            let file_list = self
                .hosts
                .current_host()
                .and_then(|h| h.slot_of(terminal))
                .and_then(|s| s.view())
                == Some(SlotView::FileList);
            if file_list {
                self.presenter.show_file_browser(terminal, true);
            }
        }
        self.publish(AppEvent::TerminalSelected { terminal_id: current });
    }

    fn publish_host_selected(&mut self) {
        self.publish(AppEvent::HostSelected { host_id: self.hosts.current() });
    }

    /// Publish on behalf of `publisher`, then hand the presenter whatever its
    /// subscription received.
    fn publish(&mut self, event: AppEvent) {
        self.bus.publish(self.publisher, &event);
        let received = std::mem::take(&mut *self.presenter_inbox.lock());
        for event in &received {
            self.presenter.event(event);
        }
    }
}

impl<P: Presenter + std::fmt::Debug> std::fmt::Debug for App<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("hosts", &self.hosts)
            .field("sessions", &self.sessions.len())
            .field("view", &self.view)
            .field("bus", &self.bus)
            .field("presenter", &self.presenter)
            .finish()
    }
}

#[cfg(test)]
#[path = "app_tests.rs"]
mod tests;
