// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Out-of-band file download from a terminal's host.
//!
//! The server serves `GET /download?{terminal_id}&{path}`; the body is the
//! raw file content.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::Url;
use tracing::debug;

use crate::error::{ClientError, ErrorCode};
use crate::protocol::TerminalId;

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);

/// Last path component usable as a local file name.
pub fn file_name(path: &str) -> Option<&str> {
    match path.trim_end_matches('/').rsplit('/').next() {
        Some("" | "." | "..") | None => None,
        Some(name) => Some(name),
    }
}

/// Build the download URL for a remote file.
pub fn download_url(base: &str, terminal: TerminalId, path: &str) -> Result<Url, ClientError> {
    let base = format!("{}/", base.trim_end_matches('/'));
    let mut url = Url::parse(&base)
        .and_then(|u| u.join("download"))
        .map_err(|e| ErrorCode::DownloadFailed.to_error(format!("{base}: {e}")))?;
    url.set_query(Some(&format!("{terminal}&{path}")));
    Ok(url)
}

#[derive(Debug, Clone)]
pub struct Downloader {
    http: reqwest::Client,
    base: String,
    dir: PathBuf,
}

impl Downloader {
    pub fn new(base: impl Into<String>, dir: impl Into<PathBuf>) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(DOWNLOAD_TIMEOUT)
            .build()
            .map_err(|e| ErrorCode::DownloadFailed.to_error(e.to_string()))?;
        Ok(Self { http, base: base.into(), dir: dir.into() })
    }

    /// Fetch `path` and write it under the download directory.
    /// Returns the local path written.
    pub async fn fetch(&self, terminal: TerminalId, path: &str) -> Result<PathBuf, ClientError> {
        let fail = |msg: String| ErrorCode::DownloadFailed.to_error(msg);
        let name = file_name(path).ok_or_else(|| fail(format!("not a file path: {path}")))?;
        let url = download_url(&self.base, terminal, path)?;
        debug!(%url, "downloading");

        let resp = self
            .http
            .get(url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| fail(e.to_string()))?;
        let body = resp.bytes().await.map_err(|e| fail(e.to_string()))?;

        let dest = self.dir.join(name);
        tokio::fs::write(&dest, &body).await.map_err(|e| fail(format!("{}: {e}", dest.display())))?;
        Ok(dest)
    }
}

#[cfg(test)]
#[path = "download_tests.rs"]
mod tests;
