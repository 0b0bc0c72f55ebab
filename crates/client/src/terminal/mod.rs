// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Live terminal sessions keyed by server-assigned id.
//!
//! Every operation is idempotent with respect to unknown ids: output or a
//! listing for a session that is already gone is dropped.

pub mod browser;
pub mod scrollback;

use std::collections::HashMap;

use crate::protocol::{HostId, TerminalId, WireEntry};

pub use browser::{DirEntry, EntryKind, FileBrowser, Navigation};
pub use scrollback::Scrollback;

/// Default bytes of output retained per session.
pub const DEFAULT_SCROLLBACK: usize = 64 * 1024;

#[derive(Debug)]
pub struct TerminalSession {
    id: TerminalId,
    host_id: HostId,
    scrollback: Scrollback,
    browser: FileBrowser,
}

impl TerminalSession {
    fn new(id: TerminalId, host_id: HostId, scrollback: usize) -> Self {
        Self {
            id,
            host_id,
            scrollback: Scrollback::new(scrollback),
            browser: FileBrowser::default(),
        }
    }

    pub fn id(&self) -> TerminalId {
        self.id
    }

    pub fn host_id(&self) -> HostId {
        self.host_id
    }

    pub fn scrollback(&self) -> &Scrollback {
        &self.scrollback
    }

    pub fn browser(&self) -> &FileBrowser {
        &self.browser
    }
}

#[derive(Debug)]
pub struct SessionRegistry {
    sessions: HashMap<TerminalId, TerminalSession>,
    scrollback: usize,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_SCROLLBACK)
    }
}

impl SessionRegistry {
    pub fn new(scrollback: usize) -> Self {
        Self { sessions: HashMap::new(), scrollback }
    }

    /// Create a session. Returns `None` if `id` is already live.
    pub fn create(&mut self, id: TerminalId, host_id: HostId) -> Option<&TerminalSession> {
        if self.sessions.contains_key(&id) {
            return None;
        }
        let session = TerminalSession::new(id, host_id, self.scrollback);
        Some(self.sessions.entry(id).or_insert(session))
    }

    /// Remove a session. A second call for the same id is a no-op.
    pub fn destroy(&mut self, id: TerminalId) -> Option<TerminalSession> {
        self.sessions.remove(&id)
    }

    /// Append output to a session's scrollback. Returns false for unknown ids.
    pub fn append_output(&mut self, id: TerminalId, data: &[u8]) -> bool {
        match self.sessions.get_mut(&id) {
            Some(session) => {
                session.scrollback.push(data);
                true
            }
            None => false,
        }
    }

    /// Replace a session's directory listing. Returns false for unknown ids.
    pub fn set_directory_listing(
        &mut self,
        id: TerminalId,
        path: &str,
        files: Vec<WireEntry>,
    ) -> bool {
        match self.sessions.get_mut(&id) {
            Some(session) => {
                session.browser.set_listing(path, files);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: TerminalId) -> Option<&TerminalSession> {
        self.sessions.get(&id)
    }

    pub fn contains(&self, id: TerminalId) -> bool {
        self.sessions.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn clear(&mut self) {
        self.sessions.clear();
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
