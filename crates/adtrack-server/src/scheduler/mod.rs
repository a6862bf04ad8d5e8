//! Background job scheduler.
//!
//! Runs the daily scrape pass inside the server process.

use std::{sync::Arc, time::Duration};

use sqlx::PgPool;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use adtrack_worker::{run_scrape_pass, AdCounter, PassOptions};

/// Builds and starts the background job scheduler.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive for
/// the lifetime of the process. Dropping it shuts down all scheduled jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised, the
/// cron expression is invalid, or the scheduler fails to start.
pub async fn build_scheduler(
    pool: PgPool,
    counter: AdCounter,
    config: Arc<adtrack_core::AppConfig>,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    register_scrape_job(&scheduler, pool, counter, &config).await?;

    scheduler.start().await?;
    Ok(scheduler)
}

/// Register the daily scrape pass on `ADTRACK_SCRAPE_CRON` (UTC).
async fn register_scrape_job(
    scheduler: &JobScheduler,
    pool: PgPool,
    counter: AdCounter,
    config: &adtrack_core::AppConfig,
) -> Result<(), JobSchedulerError> {
    let pool = Arc::new(pool);
    let options = Arc::new(pass_options(config));

    let job = Job::new_async(config.scrape_cron.as_str(), move |_uuid, _lock| {
        let pool = Arc::clone(&pool);
        let counter = counter.clone();
        let options = Arc::clone(&options);

        Box::pin(async move {
            tracing::info!("scheduler: starting daily scrape pass");
            let day = chrono::Utc::now().date_naive();
            match run_scrape_pass(&pool, &counter, &options, day).await {
                Ok(summary) => tracing::info!(
                    recorded = summary.recorded,
                    observed = summary.observed,
                    no_result = summary.no_result,
                    failed = summary.failed,
                    skipped = summary.skipped,
                    "scheduler: daily scrape pass complete"
                ),
                Err(e) => tracing::error!(error = %e, "scheduler: scrape pass aborted"),
            }
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(cron = %config.scrape_cron, "scheduler: daily scrape job registered");
    Ok(())
}

fn pass_options(config: &adtrack_core::AppConfig) -> PassOptions {
    PassOptions {
        inter_offer_delay: Duration::from_millis(config.scraper_inter_offer_delay_ms),
        ..PassOptions::default()
    }
}
