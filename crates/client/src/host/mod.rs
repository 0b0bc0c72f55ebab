// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connected hosts and their terminal slots.
//!
//! The registry owns every [`Host`] and every [`Slot`]. Slots refer to
//! terminal sessions by id only; the sessions themselves live in
//! [`crate::terminal::SessionRegistry`].
//!
//! Each host keeps at most `max_sessions` bound slots. While under that cap
//! exactly one trailing affordance slot (idle, or activating while a
//! creation request is in flight) follows them.

pub mod slot;

use indexmap::IndexMap;

use crate::protocol::{HostId, TerminalId};

pub use slot::{Slot, SlotId, SlotState, SlotView};

/// Default per-host terminal cap.
pub const DEFAULT_MAX_SESSIONS: usize = 4;

/// Identity of a remote host as announced by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostInfo {
    pub id: HostId,
    pub ip: String,
    pub user_name: String,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct Host {
    info: HostInfo,
    slots: Vec<Slot>,
    selected: Option<SlotId>,
}

impl Host {
    pub fn id(&self) -> HostId {
        self.info.id
    }

    pub fn info(&self) -> &HostInfo {
        &self.info
    }

    /// Slots in display order; the affordance, when present, is last.
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn slot(&self, id: SlotId) -> Option<&Slot> {
        self.slots.iter().find(|s| s.id() == id)
    }

    pub fn slot_of(&self, terminal: TerminalId) -> Option<&Slot> {
        self.slots.iter().find(|s| s.session() == Some(terminal))
    }

    pub fn selected(&self) -> Option<SlotId> {
        self.selected
    }

    pub fn selected_slot(&self) -> Option<&Slot> {
        self.selected.and_then(|id| self.slot(id))
    }

    /// The terminal of the selected slot.
    pub fn active_terminal(&self) -> Option<TerminalId> {
        self.selected_slot().and_then(Slot::session)
    }

    pub fn sessions(&self) -> impl Iterator<Item = TerminalId> + '_ {
        self.slots.iter().filter_map(Slot::session)
    }

    pub fn session_count(&self) -> usize {
        self.sessions().count()
    }

    pub fn affordance(&self) -> Option<&Slot> {
        self.slots.iter().find(|s| s.is_affordance())
    }

    /// True while an `Activating` slot awaits `terminal_added`.
    pub fn is_activating(&self) -> bool {
        self.slots.iter().any(|s| s.state() == SlotState::Activating)
    }

    fn position(&self, id: SlotId) -> Option<usize> {
        self.slots.iter().position(|s| s.id() == id)
    }

    /// Add an idle affordance when under the cap, or drop a stray one at it.
    fn ensure_affordance(&mut self, next_slot: &mut u64, max_sessions: usize) {
        let sessions = self.session_count();
        if sessions < max_sessions {
            if self.affordance().is_none() {
                self.slots.push(Slot::idle(alloc_slot(next_slot)));
            }
        } else {
            self.slots.retain(|s| s.state() != SlotState::Idle);
        }
    }
}

/// Result of binding a new terminal to a host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachOutcome {
    Bound {
        slot: SlotId,
        /// The terminal answered this host's pending creation request.
        requested: bool,
        /// The slot became the host's selected slot.
        selected: bool,
    },
    UnknownHost,
    Duplicate,
    AtCapacity,
}

/// Result of a slot selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectOutcome {
    /// A different slot (or host) became selected.
    Selected { terminal: TerminalId },
    /// The already-selected slot flipped between terminal and file list.
    Toggled { terminal: TerminalId, view: SlotView },
    Ignored,
}

/// Result of closing a bound slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClosedSlot {
    pub terminal: TerminalId,
    /// Terminal of the newly selected slot, if any remain.
    pub next: Option<TerminalId>,
    pub host_empty: bool,
}

/// A host removed from the registry together with the terminals it held.
#[derive(Debug, Clone)]
pub struct RemovedHost {
    pub host: Host,
    pub terminals: Vec<TerminalId>,
    pub was_current: bool,
}

#[derive(Debug)]
pub struct HostRegistry {
    hosts: IndexMap<HostId, Host>,
    current: Option<HostId>,
    next_slot: u64,
    max_sessions: usize,
}

impl Default for HostRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SESSIONS)
    }
}

impl HostRegistry {
    pub fn new(max_sessions: usize) -> Self {
        Self { hosts: IndexMap::new(), current: None, next_slot: 0, max_sessions }
    }

    pub fn max_sessions(&self) -> usize {
        self.max_sessions
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    pub fn get(&self, id: HostId) -> Option<&Host> {
        self.hosts.get(&id)
    }

    /// Hosts in connection order.
    pub fn hosts(&self) -> impl Iterator<Item = &Host> {
        self.hosts.values()
    }

    pub fn current(&self) -> Option<HostId> {
        self.current
    }

    pub fn current_host(&self) -> Option<&Host> {
        self.current.and_then(|id| self.hosts.get(&id))
    }

    /// The selected terminal of the current host.
    pub fn active_terminal(&self) -> Option<TerminalId> {
        self.current_host().and_then(Host::active_terminal)
    }

    /// Find the host and slot holding `terminal`.
    pub fn locate(&self, terminal: TerminalId) -> Option<(HostId, SlotId)> {
        self.hosts
            .values()
            .find_map(|h| h.slot_of(terminal).map(|s| (h.id(), s.id())))
    }

    /// Register a host with an idle affordance. No-op if the id is live.
    ///
    /// The first host added while none is current becomes current.
    pub fn add_host(&mut self, info: HostInfo) -> bool {
        if self.hosts.contains_key(&info.id) {
            return false;
        }
        let id = info.id;
        let mut host = Host { info, slots: Vec::new(), selected: None };
        host.ensure_affordance(&mut self.next_slot, self.max_sessions);
        self.hosts.insert(id, host);
        if self.current.is_none() {
            self.current = Some(id);
        }
        true
    }

    pub fn remove_host(&mut self, id: HostId) -> Option<RemovedHost> {
        let host = self.hosts.shift_remove(&id)?;
        let terminals = host.sessions().collect();
        let was_current = self.current == Some(id);
        if was_current {
            self.current = None;
        }
        Some(RemovedHost { host, terminals, was_current })
    }

    /// Make `id` the current host. Returns false for an unknown host.
    pub fn select_host(&mut self, id: HostId) -> bool {
        if !self.hosts.contains_key(&id) {
            return false;
        }
        self.current = Some(id);
        true
    }

    /// Bind `terminal` to the host's pending request slot, or to a new slot
    /// ahead of the affordance when nothing is pending.
    pub fn attach_terminal(&mut self, host_id: HostId, terminal: TerminalId) -> AttachOutcome {
        let max_sessions = self.max_sessions;
        let Some(host) = self.hosts.get_mut(&host_id) else {
            return AttachOutcome::UnknownHost;
        };
        if host.slot_of(terminal).is_some() {
            return AttachOutcome::Duplicate;
        }

        let pending = host.slots.iter().position(|s| s.state() == SlotState::Activating);
        let (slot, requested) = match pending {
            Some(index) if host.slots[index].bind(terminal) => (host.slots[index].id(), true),
            _ => {
                if host.session_count() >= max_sessions {
                    return AttachOutcome::AtCapacity;
                }
                let id = alloc_slot(&mut self.next_slot);
                let at =
                    host.slots.iter().position(Slot::is_affordance).unwrap_or(host.slots.len());
                host.slots.insert(at, Slot::bound(id, terminal));
                (id, false)
            }
        };
        host.ensure_affordance(&mut self.next_slot, max_sessions);

        let selected = requested || host.selected.is_none();
        if selected {
            host.selected = Some(slot);
        }
        if requested {
            self.current = Some(host_id);
        }
        AttachOutcome::Bound { slot, requested, selected }
    }

    /// Move the host's idle affordance to `Activating`.
    ///
    /// Returns `None` when the host is unknown, at its cap, or already has a
    /// request in flight.
    pub fn request_new_terminal(&mut self, host_id: HostId) -> Option<SlotId> {
        let host = self.hosts.get_mut(&host_id)?;
        if host.is_activating() {
            return None;
        }
        let slot = host.slots.iter_mut().find(|s| s.state() == SlotState::Idle)?;
        slot.activate().then(|| slot.id())
    }

    /// Select a bound slot, or toggle its view if it is already the
    /// selected slot of the current host.
    pub fn select_slot(&mut self, host_id: HostId, slot_id: SlotId) -> SelectOutcome {
        let is_current = self.current == Some(host_id);
        let Some(host) = self.hosts.get_mut(&host_id) else {
            return SelectOutcome::Ignored;
        };
        let Some(index) = host.position(slot_id) else {
            return SelectOutcome::Ignored;
        };
        let Some(terminal) = host.slots[index].session() else {
            return SelectOutcome::Ignored;
        };

        if is_current && host.selected == Some(slot_id) {
            return match host.slots[index].toggle_view() {
                Some(view) => SelectOutcome::Toggled { terminal, view },
                None => SelectOutcome::Ignored,
            };
        }
        host.selected = Some(slot_id);
        self.current = Some(host_id);
        SelectOutcome::Selected { terminal }
    }

    /// Remove a bound slot and select the last remaining bound slot.
    ///
    /// Returns `None` for unknown hosts/slots and for the affordance.
    pub fn close_slot(&mut self, host_id: HostId, slot_id: SlotId) -> Option<ClosedSlot> {
        let max_sessions = self.max_sessions;
        let host = self.hosts.get_mut(&host_id)?;
        let index = host.position(slot_id)?;
        let terminal = host.slots[index].session()?;

        host.slots.remove(index);
        host.ensure_affordance(&mut self.next_slot, max_sessions);

        let last = host.slots.iter().rev().find(|s| !s.is_affordance());
        let (selected, next) = match last {
            Some(slot) => (Some(slot.id()), slot.session()),
            None => (None, None),
        };
        host.selected = selected;
        Some(ClosedSlot { terminal, next, host_empty: next.is_none() })
    }

    /// Drop every host. Used on transport loss.
    pub fn clear(&mut self) {
        self.hosts.clear();
        self.current = None;
    }
}

fn alloc_slot(next: &mut u64) -> SlotId {
    let id = SlotId(*next);
    *next += 1;
    id
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
