// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-slot terminal lifecycle.
//!
//! ```text
//! Idle ──activate──▶ Activating ──bind──▶ Terminal ◀──toggle──▶ FileList
//! ```
//!
//! A slot leaves the machine by being removed from its host. The session
//! reference lives inside the state, so an `Idle` or `Activating` slot
//! cannot point at a terminal.

use std::fmt;

use crate::protocol::TerminalId;

/// Registry-unique slot handle. Stable across reordering of a host's slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(pub u64);

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// The "new terminal" affordance.
    Idle,
    /// A creation request is in flight.
    Activating,
    Terminal(TerminalId),
    FileList(TerminalId),
}

impl SlotState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Activating => "activating",
            Self::Terminal(_) => "terminal",
            Self::FileList(_) => "file_list",
        }
    }
}

/// Which face of a bound session a slot shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotView {
    Terminal,
    FileList,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    id: SlotId,
    state: SlotState,
}

impl Slot {
    pub(crate) fn idle(id: SlotId) -> Self {
        Self { id, state: SlotState::Idle }
    }

    pub(crate) fn bound(id: SlotId, terminal: TerminalId) -> Self {
        Self { id, state: SlotState::Terminal(terminal) }
    }

    pub fn id(&self) -> SlotId {
        self.id
    }

    pub fn state(&self) -> SlotState {
        self.state
    }

    pub fn session(&self) -> Option<TerminalId> {
        match self.state {
            SlotState::Idle | SlotState::Activating => None,
            SlotState::Terminal(t) | SlotState::FileList(t) => Some(t),
        }
    }

    /// True for the trailing add-affordance, whether idle or in flight.
    pub fn is_affordance(&self) -> bool {
        self.session().is_none()
    }

    pub fn view(&self) -> Option<SlotView> {
        match self.state {
            SlotState::Idle | SlotState::Activating => None,
            SlotState::Terminal(_) => Some(SlotView::Terminal),
            SlotState::FileList(_) => Some(SlotView::FileList),
        }
    }

    /// `Idle → Activating`. Returns false from any other state.
    pub(crate) fn activate(&mut self) -> bool {
        match self.state {
            SlotState::Idle => {
                self.state = SlotState::Activating;
                true
            }
            SlotState::Activating | SlotState::Terminal(_) | SlotState::FileList(_) => false,
        }
    }

    /// `Activating → Terminal(t)`. Returns false from any other state.
    pub(crate) fn bind(&mut self, terminal: TerminalId) -> bool {
        match self.state {
            SlotState::Activating => {
                self.state = SlotState::Terminal(terminal);
                true
            }
            SlotState::Idle | SlotState::Terminal(_) | SlotState::FileList(_) => false,
        }
    }

    /// `Terminal ⇄ FileList`. Returns the new view, or `None` for an unbound slot.
    pub(crate) fn toggle_view(&mut self) -> Option<SlotView> {
        match self.state {
            SlotState::Terminal(t) => {
                self.state = SlotState::FileList(t);
                Some(SlotView::FileList)
            }
            SlotState::FileList(t) => {
                self.state = SlotState::Terminal(t);
                Some(SlotView::Terminal)
            }
            SlotState::Idle | SlotState::Activating => None,
        }
    }
}

#[cfg(test)]
#[path = "slot_tests.rs"]
mod tests;
