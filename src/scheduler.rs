//! Periodic digest publishing.

use crate::core::config::{Cadence, DigestConfig, ScheduleConfig};
use crate::core::digest::{format_digest_random, format_failure};
use crate::core::pipeline::{AssetQuery, Pipeline};
use crate::notifier::{Notifier, NotifyOutcome};
use anyhow::{Result, anyhow};
use std::future::Future;
use std::pin::Pin;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    Published {
        assets: usize,
        message: String,
        notification: NotifyOutcome,
    },
    Failed {
        error: String,
        message: String,
        notification: NotifyOutcome,
    },
}

/// Runs one Merge → Diff → Format → Notify cycle over the full tracked set.
///
/// Upstream failures end here: they are logged and reported through the
/// notifier, and the caller only sees the outcome.
pub async fn run_tick(pipeline: &Pipeline, notifier: &Notifier, digest: &DigestConfig) -> TickOutcome {
    match pipeline.diffed_assets(&AssetQuery::default()).await {
        Ok(assets) => {
            let message = format_digest_random(&assets, digest.max_assets, &digest.view_more_url);
            let notification = notifier.notify(&message).await;
            info!(assets = assets.len(), ?notification, "Digest tick complete");
            TickOutcome::Published {
                assets: assets.len(),
                message,
                notification,
            }
        }
        Err(e) => {
            error!(error = %e, stage = %e.stage(), "Digest tick failed");
            let message = format_failure(&e);
            let notification = notifier.notify(&message).await;
            TickOutcome::Failed {
                error: e.to_string(),
                message,
                notification,
            }
        }
    }
}

fn tick_task(
    pipeline: &Pipeline,
    notifier: &Notifier,
    digest: &DigestConfig,
) -> Pin<Box<dyn Future<Output = ()> + Send>> {
    let pipeline = pipeline.clone();
    let notifier = notifier.clone();
    let digest = digest.clone();
    Box::pin(async move {
        if let TickOutcome::Failed {
            notification: NotifyOutcome::Failed(reason),
            ..
        } = run_tick(&pipeline, &notifier, &digest).await
        {
            warn!("Failure notice was not delivered: {}", reason);
        }
    })
}

/// Registers the digest job and starts the scheduler. Each tick is
/// independent; a failed tick does not affect the next one.
pub async fn start(
    pipeline: Pipeline,
    notifier: Notifier,
    digest: DigestConfig,
    schedule: &ScheduleConfig,
) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new()
        .await
        .map_err(|e| anyhow!("Failed to create job scheduler: {}", e))?;

    let job = match schedule.cadence() {
        Cadence::Cron(expression) => {
            info!("Scheduling digest job with cron expression '{}'", expression);
            Job::new_async(expression.as_str(), move |_uuid, _l| {
                tick_task(&pipeline, &notifier, &digest)
            })
            .map_err(|e| anyhow!("Invalid cron expression '{}': {}", expression, e))?
        }
        Cadence::Every(interval) => {
            info!("Scheduling digest job every {} minutes", interval.as_secs() / 60);
            Job::new_repeated_async(interval, move |_uuid, _l| {
                tick_task(&pipeline, &notifier, &digest)
            })
            .map_err(|e| anyhow!("Failed to create repeated digest job: {}", e))?
        }
    };

    scheduler
        .add(job)
        .await
        .map_err(|e| anyhow!("Failed to add digest job: {}", e))?;
    scheduler
        .start()
        .await
        .map_err(|e| anyhow!("Failed to start scheduler: {}", e))?;

    info!("Job scheduler started successfully");
    Ok(scheduler)
}
