// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::app::AppSettings;
use crate::client::ClientSettings;
use crate::transport;

const SCHEMES: &[&str] = &["http://", "https://", "ws://", "wss://"];

/// Headless client for supervising remote terminals grouped by host.
#[derive(Debug, Parser)]
#[command(name = "hostterm", version, about)]
pub struct Config {
    /// Server base URL.
    #[arg(env = "HOSTTERM_URL", default_value = "http://127.0.0.1:8080")]
    pub url: String,

    /// Reconnect attempts after the connection drops (0 disables).
    #[arg(long, env = "HOSTTERM_MAX_RECONNECTS", default_value = "10")]
    pub max_reconnects: u32,

    /// Open a terminal automatically on the first host and on hosts
    /// selected without one.
    #[arg(long, env = "HOSTTERM_AUTO_OPEN")]
    pub auto_open: bool,

    /// Concurrent terminals per host.
    #[arg(long, env = "HOSTTERM_MAX_TERMINALS", default_value = "4")]
    pub max_terminals: usize,

    /// Bytes of output kept per terminal.
    #[arg(long, env = "HOSTTERM_SCROLLBACK", default_value = "65536")]
    pub scrollback: usize,

    /// Quiet period before a resize is sent.
    #[arg(long, env = "HOSTTERM_RESIZE_DEBOUNCE_MS", default_value = "250")]
    pub resize_debounce_ms: u64,

    /// Where downloaded files are written.
    #[arg(long, env = "HOSTTERM_DOWNLOAD_DIR", default_value = ".")]
    pub download_dir: PathBuf,

    /// Log format (json or text).
    #[arg(long, env = "HOSTTERM_LOG_FORMAT", default_value = "text")]
    pub log_format: String,

    /// Log level filter.
    #[arg(long, env = "HOSTTERM_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Config {
    /// Validate the configuration after parsing.
    pub fn validate(&self) -> anyhow::Result<()> {
        if !SCHEMES.iter().any(|s| self.url.starts_with(s)) {
            anyhow::bail!("unsupported URL scheme: {} (expected http, https, ws or wss)", self.url);
        }
        if self.max_terminals == 0 {
            anyhow::bail!("--max-terminals must be at least 1");
        }
        if self.scrollback == 0 {
            anyhow::bail!("--scrollback must be greater than 0");
        }
        match self.log_format.as_str() {
            "json" | "text" => {}
            other => anyhow::bail!("invalid log format: {other}"),
        }
        Ok(())
    }

    /// WebSocket endpoint at the server root.
    pub fn ws_url(&self) -> String {
        transport::ws_url(&self.url)
    }

    /// HTTP origin for out-of-band requests such as downloads.
    pub fn http_base(&self) -> String {
        let base = self.url.trim_end_matches('/');
        if let Some(rest) = base.strip_prefix("wss://") {
            format!("https://{rest}")
        } else if let Some(rest) = base.strip_prefix("ws://") {
            format!("http://{rest}")
        } else {
            base.to_owned()
        }
    }

    pub fn resize_debounce(&self) -> Duration {
        Duration::from_millis(self.resize_debounce_ms)
    }

    pub fn app_settings(&self) -> AppSettings {
        AppSettings {
            auto_open: self.auto_open,
            max_sessions: self.max_terminals,
            scrollback: self.scrollback,
        }
    }

    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            ws_url: self.ws_url(),
            max_reconnects: self.max_reconnects,
            resize_debounce: self.resize_debounce(),
            app: self.app_settings(),
        }
    }

    /// Build a `Config` for tests pointing at `url`.
    #[doc(hidden)]
    pub fn test(url: &str) -> Self {
        Self {
            url: url.to_owned(),
            max_reconnects: 0,
            auto_open: false,
            max_terminals: 4,
            scrollback: 4096,
            resize_debounce_ms: 10,
            download_dir: PathBuf::from("."),
            log_format: "text".into(),
            log_level: "debug".into(),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
