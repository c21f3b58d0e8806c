mod config;
mod demo;
mod telemetry;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use sluice_core::app::AppBuilder;
use sluice_core::impls::{InMemoryQueue, InMemoryRecordStore};
use sluice_core::ports::RecordStore;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let config = config::WorkerConfig::from_env().context("failed to load configuration")?;
    telemetry::init(&config.log_level, &config.log_format);

    info!(app_name = %config.app_name, queue_url = %config.queue_url, "starting worker");
    info!("Configuration: {:?}", config);

    // local mode: in-process queue and store stand in for the provider services
    let queue = Arc::new(InMemoryQueue::new(Duration::from_secs(
        config.visibility_timeout_secs,
    )));
    let store = Arc::new(InMemoryRecordStore::with_table(&config.events_table));

    let seeded = demo::seed(&queue, config.demo_messages)?;
    if seeded > 0 {
        info!(count = seeded, "seeded demo messages");
    }

    let app = AppBuilder::new()
        .with_builtin_schemas()
        .expect_schemas(&[
            "user.created/v1",
            "order.placed/v1",
            "payment.processed/v1",
        ])
        .options(config.consumer_options())
        .build(queue.clone(), store.clone())
        .context("failed to build consumer")?;

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("shutdown requested");
                    cancel.cancel();
                }
                Err(err) => warn!(error = %err, "failed to listen for shutdown signal"),
            }
        }
    });

    if let Err(err) = app.run(&cancel).await {
        info!(reason = %err, "consumer exited");
    }

    info!(
        counts = ?queue.counts(),
        records = store.len(),
        table = store.target(),
        "worker stopped"
    );
    Ok(())
}
