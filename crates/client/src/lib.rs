// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

pub mod app;
pub mod bus;
pub mod client;
pub mod config;
pub mod console;
pub mod download;
pub mod error;
pub mod headless;
pub mod host;
pub mod protocol;
pub mod terminal;
pub mod test_support;
pub mod transport;
pub mod view;
