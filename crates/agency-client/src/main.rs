// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Agency Client
//!
//! Connects to the collector, streams the configured records in batches and
//! logs the winner count returned at the end of the transfer. SIGINT and
//! SIGTERM cancel the transfer gracefully.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use agency_client::{BatchAssembler, ClientConfig, Transfer, TransferOutcome};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Load .env file (from crate directory or parent directories)
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("agency_client=info".parse()?),
        )
        .init();

    let config = ClientConfig::from_env().map_err(|e| {
        error!(action = "config", result = "fail", error = %e);
        e
    })?;

    info!(
        client_id = %config.client_id,
        server_address = %config.server_address,
        max_records = config.batch_limits.max_records(),
        max_payload_bytes = config.batch_limits.max_payload_bytes(),
        "Configuration loaded"
    );

    let source = config.open_source().map_err(|e| {
        error!(action = "open_source", result = "fail", error = %e);
        anyhow::Error::new(e).context("failed to open record source")
    })?;
    let assembler = BatchAssembler::new(source, config.batch_limits);

    let cancel = CancellationToken::new();
    spawn_signal_handler(cancel.clone())?;

    let Some(stream) = connect(&config, &cancel).await? else {
        info!(action = "shutdown", result = "success", "cancelled before connecting");
        return Ok(());
    };

    let mut transfer = Transfer::new(stream, assembler, config.client_id, cancel);
    let outcome = transfer
        .run()
        .await
        .with_context(|| format!("transfer failed while {}", transfer.state()))?;

    match outcome {
        TransferOutcome::Completed(report) => {
            info!(
                batches = report.batches_sent,
                records = report.records_sent,
                winners = report.winner_count(),
                "Transfer complete"
            );
        }
        TransferOutcome::Cancelled(report) => {
            info!(
                action = "shutdown",
                result = "success",
                batches = report.batches_sent
            );
        }
    }

    Ok(())
}

/// Connect to the collector, giving up on timeout. `None` means shutdown was
/// requested while connecting.
async fn connect(config: &ClientConfig, cancel: &CancellationToken) -> Result<Option<TcpStream>> {
    let timeout = Duration::from_millis(config.connect_timeout_ms);
    let connecting = tokio::time::timeout(timeout, TcpStream::connect(&config.server_address));

    let stream = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Ok(None),
        result = connecting => match result {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                error!(action = "connect", result = "fail", address = %config.server_address, error = %e);
                return Err(e).context(format!("failed to connect to {}", config.server_address));
            }
            Err(_) => {
                error!(action = "connect", result = "fail", address = %config.server_address, "timed out");
                bail!(
                    "timed out connecting to {} after {}ms",
                    config.server_address,
                    config.connect_timeout_ms
                );
            }
        },
    };

    stream.set_nodelay(true)?;
    info!(action = "connect", result = "success", address = %config.server_address);
    Ok(Some(stream))
}

/// Cancel the token on SIGINT or SIGTERM
#[cfg(unix)]
fn spawn_signal_handler(cancel: CancellationToken) -> Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigint = signal(SignalKind::interrupt()).context("failed to install SIGINT handler")?;
    let mut sigterm =
        signal(SignalKind::terminate()).context("failed to install SIGTERM handler")?;

    tokio::spawn(async move {
        let name = tokio::select! {
            _ = sigint.recv() => "SIGINT",
            _ = sigterm.recv() => "SIGTERM",
        };
        info!(action = "shutdown", result = "in_progress", signal = name);
        cancel.cancel();
    });
    Ok(())
}

#[cfg(not(unix))]
fn spawn_signal_handler(cancel: CancellationToken) -> Result<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!(action = "shutdown", result = "in_progress", signal = "ctrl_c");
            cancel.cancel();
        }
    });
    Ok(())
}
