// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rendering capability and the single-session view selector.

use crate::bus::AppEvent;
use crate::host::Host;
use crate::protocol::{HostId, TerminalId};
use crate::terminal::TerminalSession;

/// Rendering collaborator driven by the application context.
///
/// The core never draws anything itself; it tells the presenter what
/// changed and lets it decide how to show it. Every method defaults to a
/// no-op so a presenter only implements what it renders.
pub trait Presenter: Send + 'static {
    /// The transport is up and a fresh context was built.
    fn connected(&mut self) {}

    /// The transport was lost; all hosts and sessions are gone.
    fn disconnected(&mut self) {}

    fn host_added(&mut self, _host: &Host) {}

    fn host_removed(&mut self, _host: HostId) {}

    /// A host's slots changed state, order, or selection.
    fn slots_changed(&mut self, _host: &Host) {}

    /// An application event from the presenter's bus subscription. Events
    /// caused by the presenter's own intents are not delivered.
    fn event(&mut self, _event: &AppEvent) {}

    /// Swap the presented session. The previous one is detached, not
    /// destroyed. A new session should be replayed from its scrollback.
    fn present(&mut self, _session: Option<&TerminalSession>) {}

    /// Live output for the presented session.
    fn output(&mut self, _terminal: TerminalId, _data: &[u8]) {}

    /// Show or hide the file browser of a session.
    fn show_file_browser(&mut self, _terminal: TerminalId, _visible: bool) {}

    fn render_entries(&mut self, _session: &TerminalSession) {}

    /// A file entry was opened; `path` is fully qualified on the remote host.
    fn download(&mut self, _terminal: TerminalId, _path: &str) {}

    /// Informational text for the user, such as a console command reply.
    fn notice(&mut self, _text: &str) {}
}

/// Tracks the one session currently presented.
///
/// Never refers to a destroyed session: callers clear it before destroying.
#[derive(Debug, Default)]
pub struct ActiveView {
    current: Option<TerminalId>,
}

impl ActiveView {
    pub fn current(&self) -> Option<TerminalId> {
        self.current
    }

    /// Present `session` (or nothing). Returns true if the presented
    /// session changed.
    pub fn present<P: Presenter + ?Sized>(
        &mut self,
        presenter: &mut P,
        session: Option<&TerminalSession>,
    ) -> bool {
        let next = session.map(TerminalSession::id);
        if next == self.current {
            return false;
        }
        self.current = next;
        presenter.present(session);
        true
    }

    /// Forget the presented session without notifying anyone.
    pub fn reset(&mut self) {
        self.current = None;
    }
}

#[cfg(test)]
#[path = "view_tests.rs"]
mod tests;
