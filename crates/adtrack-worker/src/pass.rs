use std::collections::HashSet;
use std::time::Duration;

use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use adtrack_db::{record_observation, OfferRow, RecordOutcome};

use crate::{counter::AdCounter, error::WorkerError};

/// Result of one scrape-and-reconcile cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrapeOutcome {
    /// A count was observed and written.
    Recorded { count: u32, variation: String },
    /// A count was observed but not written (dry run).
    Observed { count: u32 },
    /// No count could be read; nothing was written.
    NoResult,
}

impl ScrapeOutcome {
    #[must_use]
    pub fn count(&self) -> Option<u32> {
        match self {
            ScrapeOutcome::Recorded { count, .. } | ScrapeOutcome::Observed { count } => {
                Some(*count)
            }
            ScrapeOutcome::NoResult => None,
        }
    }
}

/// Scrape one offer's source page and reconcile the count for `day`.
///
/// # Errors
///
/// Returns [`WorkerError::Db`] if the reconcile write fails. Scrape failures
/// are not errors; they produce [`ScrapeOutcome::NoResult`].
pub async fn scrape_and_record(
    pool: &PgPool,
    counter: &AdCounter,
    offer_id: Uuid,
    url: &str,
    day: NaiveDate,
) -> Result<ScrapeOutcome, WorkerError> {
    let Some(count) = counter.count(url).await else {
        tracing::info!(%offer_id, "no count observed; leaving stored values untouched");
        return Ok(ScrapeOutcome::NoResult);
    };

    match record_observation(pool, offer_id, Some(i64::from(count)), day).await? {
        RecordOutcome::Recorded(plan) => Ok(ScrapeOutcome::Recorded {
            count,
            variation: plan.variation,
        }),
        RecordOutcome::Skipped => Ok(ScrapeOutcome::NoResult),
    }
}

#[derive(Debug, Clone)]
pub struct PassOptions {
    pub inter_offer_delay: Duration,
    /// Restrict the pass to a single offer.
    pub only_offer: Option<Uuid>,
    /// Scrape and log counts without writing anything.
    pub dry_run: bool,
}

impl Default for PassOptions {
    fn default() -> Self {
        Self {
            inter_offer_delay: Duration::from_millis(2000),
            only_offer: None,
            dry_run: false,
        }
    }
}

/// Totals for one scrape pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub recorded: usize,
    /// Counts read during a dry run; nothing was written for these.
    pub observed: usize,
    pub no_result: usize,
    pub failed: usize,
    /// Enabled offers left out because they have no source URL.
    pub skipped: usize,
}

impl PassSummary {
    #[must_use]
    pub fn attempted(&self) -> usize {
        self.recorded + self.observed + self.no_result + self.failed
    }
}

/// Scrape every offer returned by [`adtrack_db::list_scrape_targets`] once,
/// sequentially.
///
/// Enabled offers without a source URL are counted as skipped. Per-offer
/// database errors are logged and the pass moves on; only failing to load the
/// offer lists aborts the pass.
///
/// # Errors
///
/// Returns [`WorkerError::Db`] if either offer list cannot be loaded.
pub async fn run_scrape_pass(
    pool: &PgPool,
    counter: &AdCounter,
    options: &PassOptions,
    day: NaiveDate,
) -> Result<PassSummary, WorkerError> {
    let selected = |o: &OfferRow| options.only_offer.is_none_or(|id| id == o.id);

    let targets: Vec<OfferRow> = adtrack_db::list_scrape_targets(pool)
        .await?
        .into_iter()
        .filter(|o| selected(o))
        .collect();
    let target_ids: HashSet<Uuid> = targets.iter().map(|o| o.id).collect();

    let mut summary = PassSummary::default();
    for offer in adtrack_db::list_offers(pool).await? {
        if offer.enabled && selected(&offer) && !target_ids.contains(&offer.id) {
            tracing::info!(offer_id = %offer.id, offer = %offer.name, "no source URL; skipping");
            summary.skipped += 1;
        }
    }

    tracing::info!(
        offers = targets.len(),
        skipped = summary.skipped,
        %day,
        dry_run = options.dry_run,
        "starting scrape pass"
    );

    let mut first = true;

    for offer in &targets {
        let Some(url) = offer.source_url.as_deref() else {
            continue;
        };

        if !first && !options.inter_offer_delay.is_zero() {
            tokio::time::sleep(options.inter_offer_delay).await;
        }
        first = false;

        let outcome = if options.dry_run {
            Ok(counter
                .count(url)
                .await
                .map_or(ScrapeOutcome::NoResult, |count| ScrapeOutcome::Observed {
                    count,
                }))
        } else {
            scrape_and_record(pool, counter, offer.id, url, day).await
        };

        match outcome {
            Ok(ScrapeOutcome::Recorded { count, variation }) => {
                tracing::info!(
                    offer_id = %offer.id,
                    offer = %offer.name,
                    count,
                    variation = %variation,
                    "offer scraped"
                );
                summary.recorded += 1;
            }
            Ok(ScrapeOutcome::Observed { count }) => {
                tracing::info!(offer_id = %offer.id, offer = %offer.name, count, "dry run: observed");
                summary.observed += 1;
            }
            Ok(ScrapeOutcome::NoResult) => summary.no_result += 1,
            Err(e) => {
                tracing::error!(offer_id = %offer.id, offer = %offer.name, error = %e, "failed to record scrape");
                summary.failed += 1;
            }
        }
    }

    tracing::info!(
        recorded = summary.recorded,
        observed = summary.observed,
        no_result = summary.no_result,
        failed = summary.failed,
        skipped = summary.skipped,
        "scrape pass finished"
    );

    Ok(summary)
}
