// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::Parser;
use tokio::io::BufReader;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use hostterm::client;
use hostterm::config::Config;
use hostterm::download::Downloader;
use hostterm::headless::{read_commands, ConsolePresenter};

#[tokio::main]
async fn main() {
    let config = Config::parse();

    if let Err(e) = config.validate() {
        eprintln!("error: {e}");
        std::process::exit(2);
    }

    init_tracing(&config);
    let _ = rustls::crypto::ring::default_provider().install_default();

    if let Err(e) = run(config).await {
        error!("fatal: {e:#}");
        std::process::exit(1);
    }
}

fn init_tracing(config: &Config) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    // Logs go to stderr; stdout carries terminal output.
    match config.log_format.as_str() {
        "json" => {
            fmt::fmt().with_env_filter(filter).with_writer(std::io::stderr).json().init();
        }
        _ => {
            fmt::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
        }
    }
}

async fn run(config: Config) -> anyhow::Result<()> {
    let shutdown = CancellationToken::new();

    // Spawn signal handler
    {
        let sd = shutdown.clone();
        tokio::spawn(async move {
            let mut sigterm =
                tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()).ok();
            let mut sigint =
                tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt()).ok();

            tokio::select! {
                _ = async {
                    if let Some(ref mut s) = sigterm { s.recv().await } else { std::future::pending().await }
                } => {
                    info!("received SIGTERM");
                    sd.cancel();
                }
                _ = async {
                    if let Some(ref mut s) = sigint { s.recv().await } else { std::future::pending().await }
                } => {
                    info!("received SIGINT");
                    sd.cancel();
                }
            }
        });
    }

    let downloader = Downloader::new(config.http_base(), config.download_dir.clone())?;
    let presenter = ConsolePresenter::new(std::io::stdout(), Some(downloader));

    // The client keeps running after stdin closes; only a signal stops it.
    let (tx, mut inputs) = mpsc::unbounded_channel();
    let stdin_tx = tx.clone();
    tokio::spawn(async move {
        if let Err(e) = read_commands(BufReader::new(tokio::io::stdin()), stdin_tx).await {
            warn!("stdin: {e}");
        }
        info!("stdin closed");
    });

    let settings = config.client_settings();
    info!(url = %settings.ws_url, "starting");
    client::run(&settings, presenter, &mut inputs, shutdown).await?;
    drop(tx);
    Ok(())
}
