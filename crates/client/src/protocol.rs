// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire protocol between the client and the terminal server.
//!
//! Every message is a JSON object with a `type` discriminator. Outbound
//! requests are [`ClientMessage`]s; inbound events are [`ServerMessage`]s.
//! Decoding distinguishes unknown `type` values from malformed payloads so
//! the connection loop can log and drop either without tearing down.

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, ErrorCode};

/// Server-assigned identifier of a remote host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HostId(pub u32);

/// Server-assigned identifier of a terminal session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TerminalId(pub u32);

impl fmt::Display for HostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for TerminalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// -- Outbound ----------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    TerminalReq {
        remote_host_id: HostId,
    },
    TerminalResize {
        terminal_id: TerminalId,
        width: u16,
        height: u16,
    },
    TerminalKey {
        terminal_id: TerminalId,
        key: String,
    },
    TerminalDel {
        terminal_id: TerminalId,
    },
    FileReq {
        terminal_id: TerminalId,
        path: String,
        #[serde(default)]
        list: bool,
    },
}

impl ClientMessage {
    /// The wire `type` string of this message.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TerminalReq { .. } => "terminal_req",
            Self::TerminalResize { .. } => "terminal_resize",
            Self::TerminalKey { .. } => "terminal_key",
            Self::TerminalDel { .. } => "terminal_del",
            Self::FileReq { .. } => "file_req",
        }
    }
}

// -- Inbound -----------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    HostConnected {
        host_id: HostId,
        #[serde(default)]
        host_ip: String,
        #[serde(default)]
        host_user_name: String,
        #[serde(default)]
        host_name: String,
    },
    HostDisconnected {
        host_id: HostId,
    },
    TerminalAdded {
        host_id: HostId,
        terminal_id: TerminalId,
    },
    TerminalOutput {
        terminal_id: TerminalId,
        output: OutputPayload,
    },
    TerminalClosed {
        /// Older servers omit the host; the owner is resolved locally.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        host_id: Option<HostId>,
        terminal_id: TerminalId,
    },
    DirectoryListingReceived {
        terminal_id: TerminalId,
        req_path: String,
        #[serde(default)]
        files: Vec<WireEntry>,
    },
}

/// Inbound `type` values this client understands.
pub const SERVER_MESSAGE_TYPES: &[&str] = &[
    "host_connected",
    "host_disconnected",
    "terminal_added",
    "terminal_output",
    "terminal_closed",
    "directory_listing_received",
];

/// Terminal output as sent by the server.
///
/// Accepts a plain string, a `{ "bytes": [...] }` object, or a bare byte array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OutputPayload {
    Text(String),
    Wrapped { bytes: Vec<u8> },
    Raw(Vec<u8>),
}

impl OutputPayload {
    pub fn into_bytes(self) -> Bytes {
        match self {
            Self::Text(text) => Bytes::from(text),
            Self::Wrapped { bytes } | Self::Raw(bytes) => Bytes::from(bytes),
        }
    }
}

/// Directory entry as listed by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireEntry {
    pub name: String,
    #[serde(default)]
    pub is_dir: bool,
    #[serde(default)]
    pub size: u64,
    /// Epoch seconds; 0 when unknown.
    #[serde(default)]
    pub last_mod: u64,
}

// -- Codec -------------------------------------------------------------------

/// Decode one inbound text frame.
pub fn decode(text: &str) -> Result<ServerMessage, ClientError> {
    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|e| ErrorCode::Malformed.to_error(e.to_string()))?;

    let kind = value
        .get("type")
        .and_then(|t| t.as_str())
        .ok_or_else(|| ErrorCode::Malformed.to_error("missing type"))?;
    if !SERVER_MESSAGE_TYPES.contains(&kind) {
        return Err(ErrorCode::UnknownType.to_error(kind.to_owned()));
    }

    serde_json::from_value(value).map_err(|e| ErrorCode::Malformed.to_error(e.to_string()))
}

/// Encode one outbound request as a text frame.
pub fn encode(msg: &ClientMessage) -> Result<String, ClientError> {
    serde_json::to_string(msg).map_err(|e| ErrorCode::Malformed.to_error(e.to_string()))
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
