//! Background job scheduler.
//!
//! Resumes interrupted analysis runs at startup and registers the recurring
//! re-analysis job for tracked brands.

use std::sync::Arc;

use sqlx::PgPool;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use crate::runs::RunLauncher;

/// Builds and starts the background job scheduler.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive
/// for the lifetime of the process; dropping it shuts down all jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// a job cannot be registered, or the scheduler fails to start.
pub async fn build_scheduler(
    pool: PgPool,
    launcher: Arc<RunLauncher>,
) -> Result<JobScheduler, JobSchedulerError> {
    match launcher.resume_interrupted().await {
        Ok(0) => {}
        Ok(count) => tracing::info!(count, "resumed interrupted analysis runs"),
        Err(e) => tracing::error!(error = %e, "failed to list interrupted runs"),
    }

    let scheduler = JobScheduler::new().await?;
    register_refresh_job(&scheduler, pool, launcher).await?;
    scheduler.start().await?;
    Ok(scheduler)
}

/// Register the daily brand-refresh job.
///
/// Runs every day at 03:00 UTC (`0 0 3 * * *`) and queues a fresh analysis
/// run for every active brand, keeping visibility history moving without
/// manual submissions.
async fn register_refresh_job(
    scheduler: &JobScheduler,
    pool: PgPool,
    launcher: Arc<RunLauncher>,
) -> Result<(), JobSchedulerError> {
    let pool = Arc::new(pool);

    let job = Job::new_async("0 0 3 * * *", move |_uuid, _lock| {
        let pool = Arc::clone(&pool);
        let launcher = Arc::clone(&launcher);

        Box::pin(async move {
            tracing::info!("scheduler: starting daily brand refresh");
            run_refresh_job(&pool, &launcher).await;
            tracing::info!("scheduler: daily brand refresh complete");
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}

/// Queue one analysis run per active brand.
async fn run_refresh_job(pool: &PgPool, launcher: &Arc<RunLauncher>) {
    let brands = match aivis_db::list_brands(pool, 200).await {
        Ok(b) => b,
        Err(e) => {
            tracing::error!(error = %e, "scheduler: failed to load brands");
            return;
        }
    };

    for brand in brands.into_iter().filter(|b| b.is_active) {
        let run = aivis_db::create_analysis_run(
            pool,
            brand.id,
            &brand.domain,
            &format!("reports@{}", brand.domain),
            chrono::Utc::now(),
        )
        .await;

        match run {
            Ok(run) => {
                tracing::info!(run_id = run.id, domain = %brand.domain, "scheduled refresh run");
                launcher.spawn(run);
            }
            Err(e) => {
                tracing::error!(domain = %brand.domain, error = %e, "scheduler: failed to queue run");
            }
        }
    }
}
