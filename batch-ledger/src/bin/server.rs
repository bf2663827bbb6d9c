//! Batch ledger server binary

use anyhow::Context;
use batch_ledger::{Config, InMemoryFarmDirectory, Ledger};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting batch ledger server");

    let config = match std::env::var("BATCH_LEDGER_CONFIG") {
        Ok(path) => Config::from_file(&path)
            .with_context(|| format!("loading configuration from {}", path))?,
        Err(_) => Config::from_env().context("loading configuration from environment")?,
    };

    let directory = Arc::new(InMemoryFarmDirectory::with_active(config.active_farms()));
    if directory.is_empty() {
        tracing::warn!("No active farms configured, batch creation will be rejected");
    } else {
        tracing::info!(active_farms = directory.len(), "Farm directory loaded");
    }

    let ledger = Ledger::open(config, directory)
        .await
        .context("opening ledger")?;

    tracing::info!(
        administrator = %ledger.contract_owner()?,
        paused = ledger.is_paused()?,
        batch_count = ledger.batch_count()?,
        data_dir = ?ledger.config().data_dir,
        "Ledger opened successfully"
    );

    let mut events = ledger.subscribe();
    loop {
        tokio::select! {
            received = events.recv() => match received {
                Ok(record) => match record.to_json() {
                    Ok(json) => tracing::info!(sequence = record.sequence, event = %json, "Ledger event"),
                    Err(e) => tracing::warn!(sequence = record.sequence, error = %e, "Unencodable event"),
                },
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Event log subscriber lagged, replay from storage");
                }
                Err(RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    tracing::info!("Shutting down batch ledger server");
    ledger.shutdown().await?;
    Ok(())
}
