// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process event bus for application events.
//!
//! Delivery is synchronous and in subscription order. The publishing
//! subscriber (if any) never receives its own event. A handler can drop
//! its own subscription during delivery by returning [`Delivery::Unsubscribe`].

use crate::protocol::{HostId, TerminalId};

/// Application-level events published after state changes settle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    TerminalAdded { host_id: HostId, terminal_id: TerminalId },
    TerminalClosed { host_id: HostId, terminal_id: TerminalId },
    /// The current host changed; `None` once no host is current.
    HostSelected { host_id: Option<HostId> },
    /// The presented terminal changed; `None` once nothing is presented.
    TerminalSelected { terminal_id: Option<TerminalId> },
}

/// Handle returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

/// What a handler wants after receiving an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Keep,
    Unsubscribe,
}

type Handler = Box<dyn FnMut(&AppEvent) -> Delivery + Send>;

struct Subscription {
    id: SubscriberId,
    handler: Handler,
}

#[derive(Default)]
pub struct EventBus {
    next_id: u64,
    subscribers: Vec<Subscription>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, handler: F) -> SubscriberId
    where
        F: FnMut(&AppEvent) -> Delivery + Send + 'static,
    {
        let id = SubscriberId(self.next_id);
        self.next_id += 1;
        self.subscribers.push(Subscription { id, handler: Box::new(handler) });
        id
    }

    /// Remove a subscription. Returns false if it was not registered.
    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|s| s.id != id);
        self.subscribers.len() != before
    }

    /// Deliver `event` to every subscriber except `sender`.
    pub fn publish(&mut self, sender: Option<SubscriberId>, event: &AppEvent) {
        self.subscribers.retain_mut(|sub| {
            if Some(sub.id) == sender {
                return true;
            }
            (sub.handler)(event) == Delivery::Keep
        });
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus").field("subscribers", &self.subscribers.len()).finish()
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
