// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Line commands for the headless client.
//!
//! Lines starting with `:` are commands; anything else is typed into the
//! presented terminal followed by a carriage return.

use std::fmt::Write as _;

use crate::app::{App, Intent};
use crate::protocol::HostId;
use crate::view::Presenter;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// List hosts and their slots.
    Hosts,
    Host(HostId),
    /// Request a new terminal on the current host.
    Add,
    /// Click the n-th slot (1-based) of the current host.
    Slot(usize),
    /// Close the n-th slot, or the selected one.
    Close(Option<usize>),
    /// Toggle the file browser of the selected slot.
    Files,
    Ls(String),
    Open(String),
    Resize { cols: u16, rows: u16 },
    Keys(String),
}

impl ConsoleCommand {
    pub fn parse(line: &str) -> anyhow::Result<Self> {
        let line = line.trim_end_matches(['\r', '\n']);
        let Some(command) = line.strip_prefix(':') else {
            return Ok(Self::Keys(format!("{line}\r")));
        };
        let mut words = command.split_whitespace();
        let name = words.next().unwrap_or_default();
        let rest: Vec<&str> = words.collect();

        let cmd = match (name, rest.as_slice()) {
            ("hosts", []) => Self::Hosts,
            ("host", [id]) => Self::Host(HostId(id.parse()?)),
            ("add", []) => Self::Add,
            ("slot", [n]) => Self::Slot(parse_index(n)?),
            ("close", []) => Self::Close(None),
            ("close", [n]) => Self::Close(Some(parse_index(n)?)),
            ("files", []) => Self::Files,
            ("ls", []) => Self::Ls("/".to_owned()),
            ("ls", [path]) => Self::Ls((*path).to_owned()),
            ("open", [_, ..]) => Self::Open(rest.join(" ")),
            ("resize", [cols, rows]) => Self::Resize { cols: cols.parse()?, rows: rows.parse()? },
            _ => anyhow::bail!("unknown command: {line}"),
        };
        Ok(cmd)
    }
}

fn parse_index(s: &str) -> anyhow::Result<usize> {
    match s.parse::<usize>()? {
        0 => anyhow::bail!("slots are numbered from 1"),
        n => Ok(n),
    }
}

/// What a command turns into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    Intent(Intent),
    /// Text to show without changing anything.
    Reply(String),
}

/// Resolve a command against the current state.
pub fn resolve<P: Presenter>(app: &App<P>, cmd: ConsoleCommand) -> anyhow::Result<Resolved> {
    let hosts = app.hosts();
    let current = move || hosts.current_host().ok_or_else(|| anyhow::anyhow!("no host selected"));
    let active = || app.active_terminal().ok_or_else(|| anyhow::anyhow!("no active terminal"));

    let intent = match cmd {
        ConsoleCommand::Hosts => return Ok(Resolved::Reply(describe_hosts(app))),
        ConsoleCommand::Host(id) => {
            if hosts.get(id).is_none() {
                anyhow::bail!("unknown host {id}");
            }
            Intent::SelectHost(id)
        }
        ConsoleCommand::Add => Intent::AddTerminal(current()?.id()),
        ConsoleCommand::Slot(n) => {
            let host = current()?;
            let slot = n
                .checked_sub(1)
                .and_then(|i| host.slots().get(i))
                .ok_or_else(|| anyhow::anyhow!("no slot {n}"))?;
            if slot.is_affordance() {
                Intent::AddTerminal(host.id())
            } else {
                Intent::SelectSlot { host: host.id(), slot: slot.id() }
            }
        }
        ConsoleCommand::Close(n) => {
            let host = current()?;
            let slot = match n {
                Some(n) => n.checked_sub(1).and_then(|i| host.slots().get(i)),
                None => host.selected_slot(),
            };
            let slot = slot
                .filter(|s| !s.is_affordance())
                .ok_or_else(|| anyhow::anyhow!("no terminal to close"))?;
            Intent::CloseSlot { host: host.id(), slot: slot.id() }
        }
        ConsoleCommand::Files => {
            let host = current()?;
            let slot = host.selected().ok_or_else(|| anyhow::anyhow!("no terminal selected"))?;
            Intent::SelectSlot { host: host.id(), slot }
        }
        ConsoleCommand::Ls(path) => Intent::ListDirectory { terminal: active()?, path },
        ConsoleCommand::Open(name) => {
            let terminal = active()?;
            let index = app
                .sessions()
                .get(terminal)
                .and_then(|s| s.browser().find(&name))
                .ok_or_else(|| anyhow::anyhow!("no entry named {name:?}"))?;
            Intent::OpenEntry { terminal, index }
        }
        ConsoleCommand::Resize { cols, rows } => Intent::Resize { terminal: active()?, cols, rows },
        ConsoleCommand::Keys(data) => Intent::Key { terminal: active()?, data },
    };
    Ok(Resolved::Intent(intent))
}

fn describe_hosts<P: Presenter>(app: &App<P>) -> String {
    let hosts = app.hosts();
    if hosts.is_empty() {
        return "no hosts connected".to_owned();
    }
    let mut out = String::new();
    for host in hosts.hosts() {
        let marker = if hosts.current() == Some(host.id()) { '*' } else { ' ' };
        let info = host.info();
        let _ =
            write!(out, "{marker} {} {}@{} ({})", host.id(), info.user_name, info.name, info.ip);
        for (i, slot) in host.slots().iter().enumerate() {
            let selected = if host.selected() == Some(slot.id()) { ">" } else { "" };
            let _ = write!(out, "  [{}]{selected}{}", i + 1, slot.state().as_str());
            if let Some(t) = slot.session() {
                let _ = write!(out, ":{t}");
            }
        }
        out.push('\n');
    }
    out.truncate(out.trim_end().len());
    out
}

#[cfg(test)]
#[path = "console_tests.rs"]
mod tests;
