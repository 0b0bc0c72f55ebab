// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remote file-browser state attached to a terminal session.

use crate::protocol::WireEntry;

pub const ROOT: &str = "/";

/// Display name of the synthetic parent entry.
pub const PARENT_NAME: &str = "..";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Synthetic `..` entry pointing at the parent directory.
    Parent,
    Directory,
    File,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    /// Absolute remote path.
    pub path: String,
    pub kind: EntryKind,
    pub size: u64,
    /// Epoch seconds; 0 when unknown.
    pub last_modified: u64,
}

impl DirEntry {
    pub fn is_dir(&self) -> bool {
        matches!(self.kind, EntryKind::Parent | EntryKind::Directory)
    }

    /// Last-modified column text; blank when the server sent 0.
    pub fn display_modified(&self) -> Option<String> {
        (self.last_modified != 0).then(|| format_timestamp(self.last_modified))
    }

    /// Size column text; directories have none.
    pub fn display_size(&self) -> Option<String> {
        (!self.is_dir()).then(|| format_size(self.size))
    }
}

/// What opening an entry leads to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    /// Request a listing of this directory.
    List(String),
    /// Hand this file path to the download boundary.
    Download(String),
}

#[derive(Debug, Clone, Default)]
pub struct FileBrowser {
    path: Option<String>,
    entries: Vec<DirEntry>,
}

impl FileBrowser {
    /// Current directory, once a listing has arrived.
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn has_listing(&self) -> bool {
        self.path.is_some()
    }

    /// Entries in display order, `..` first when present.
    pub fn entries(&self) -> &[DirEntry] {
        &self.entries
    }

    pub fn find(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.name == name)
    }

    /// Replace the listing. `path` becomes the base for relative navigation.
    pub fn set_listing(&mut self, path: &str, files: Vec<WireEntry>) {
        let path = normalize(path);
        let mut entries = Vec::with_capacity(files.len() + 1);
        if path != ROOT {
            entries.push(DirEntry {
                name: PARENT_NAME.to_owned(),
                path: parent_path(&path),
                kind: EntryKind::Parent,
                size: 0,
                last_modified: 0,
            });
        }
        entries.extend(files.into_iter().map(|f| DirEntry {
            path: join_path(&path, &f.name),
            kind: if f.is_dir { EntryKind::Directory } else { EntryKind::File },
            name: f.name,
            size: f.size,
            last_modified: f.last_mod,
        }));
        self.path = Some(path);
        self.entries = entries;
    }

    /// Resolve the entry at `index` into a navigation target.
    pub fn navigate(&self, index: usize) -> Option<Navigation> {
        let entry = self.entries.get(index)?;
        Some(if entry.is_dir() {
            Navigation::List(entry.path.clone())
        } else {
            Navigation::Download(entry.path.clone())
        })
    }
}

/// Absolute form of `path` with `.` and `..` folded and no trailing slash.
/// `..` never climbs above the root.
pub fn normalize(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            name => parts.push(name),
        }
    }
    if parts.is_empty() {
        ROOT.to_owned()
    } else {
        format!("/{}", parts.join("/"))
    }
}

pub fn parent_path(path: &str) -> String {
    let path = normalize(path);
    match path.rfind('/') {
        Some(0) | None => ROOT.to_owned(),
        Some(i) => path[..i].to_owned(),
    }
}

pub fn join_path(dir: &str, name: &str) -> String {
    normalize(&format!("{dir}/{name}"))
}

/// Human-readable size: bytes up to 1 KiB, then KB/MB/GB with two decimals.
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    match bytes {
        b if b > GB => format!("{:.2} GB", b as f64 / GB as f64),
        b if b > MB => format!("{:.2} MB", b as f64 / MB as f64),
        b if b > KB => format!("{:.2} KB", b as f64 / KB as f64),
        b => format!("{b} B"),
    }
}

/// UTC `YYYY-MM-DD HH:MM:SS` for epoch seconds.
pub fn format_timestamp(secs: u64) -> String {
    let time_secs = secs % 86400;
    let hours = time_secs / 3600;
    let minutes = (time_secs % 3600) / 60;
    let seconds = time_secs % 60;
    // Civil calendar from days since epoch (Howard Hinnant's algorithm).
    let z = (secs / 86400) as i64 + 719468;
    let era = z / 146097;
    let doe = (z - era * 146097) as u64;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let y = yoe as i64 + era * 400 + i64::from(m <= 2);
    format!("{y:04}-{m:02}-{d:02} {hours:02}:{minutes:02}:{seconds:02}")
}

#[cfg(test)]
#[path = "browser_tests.rs"]
mod tests;
