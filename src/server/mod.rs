//! HTTP API serving the diffed dataset, with the digest scheduler running
//! alongside it.

pub mod error;
pub mod handler;
pub mod router;

use crate::core::config::AppConfig;
use crate::core::pipeline::Pipeline;
use crate::notifier::Notifier;
use crate::scheduler;
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

pub async fn serve(config: &AppConfig, pipeline: Pipeline) -> Result<()> {
    let notifier = Notifier::from_config(&config.notifications);
    if !notifier.is_active() {
        info!("Webhook notifications are disabled; digests will only be logged");
    }

    let mut jobs = scheduler::start(
        pipeline.clone(),
        notifier,
        config.digest.clone(),
        &config.schedule,
    )
    .await?;

    let address = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;
    info!("Server listening on {}", address);

    axum::serve(listener, router::router(Arc::new(pipeline)))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    if let Err(e) = jobs.shutdown().await {
        warn!("Failed to stop job scheduler cleanly: {}", e);
    }
    Ok(())
}
