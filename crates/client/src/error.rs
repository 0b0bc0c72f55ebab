// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error codes shared by the codec, transport, and download boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    Malformed,
    UnknownType,
    Disconnected,
    SendFailed,
    DownloadFailed,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Malformed => "MALFORMED",
            Self::UnknownType => "UNKNOWN_TYPE",
            Self::Disconnected => "DISCONNECTED",
            Self::SendFailed => "SEND_FAILED",
            Self::DownloadFailed => "DOWNLOAD_FAILED",
        }
    }

    /// Whether an error with this code ends the current connection.
    ///
    /// Protocol errors are dropped message-by-message and a failed download
    /// only affects that transfer.
    pub fn is_fatal_to_connection(&self) -> bool {
        match self {
            Self::Malformed | Self::UnknownType | Self::DownloadFailed => false,
            Self::Disconnected | Self::SendFailed => true,
        }
    }

    pub fn to_error(&self, message: impl Into<String>) -> ClientError {
        ClientError { code: *self, message: message.into() }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error with machine-readable code and human-readable message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientError {
    pub code: ErrorCode,
    pub message: String,
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ClientError {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
