//! Scrape-pass and ledger maintenance commands.

use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use adtrack_worker::{run_scrape_pass, AdCounter, PassOptions, PassSummary};

/// One-line summary printed after a pass.
pub(crate) fn summary_line(summary: &PassSummary) -> String {
    format!(
        "recorded {}, observed {} (dry run), no result {}, failed {}, skipped {} (no source URL)",
        summary.recorded, summary.observed, summary.no_result, summary.failed, summary.skipped
    )
}

/// Run one scrape pass over every enabled offer (or just `offer`).
///
/// # Errors
///
/// Returns an error if the renderer cannot be built, the requested offer does
/// not exist, or the offer list cannot be loaded. Per-offer failures are
/// logged and counted, not propagated.
pub(crate) async fn run_scrape(
    pool: &sqlx::PgPool,
    config: &adtrack_core::AppConfig,
    offer: Option<Uuid>,
    dry_run: bool,
) -> anyhow::Result<()> {
    if let Some(id) = offer {
        adtrack_db::get_offer(pool, id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("offer '{id}' not found"))?;
    }

    let counter = AdCounter::from_config(config)?;
    let options = PassOptions {
        inter_offer_delay: Duration::from_millis(config.scraper_inter_offer_delay_ms),
        only_offer: offer,
        dry_run,
    };

    let summary = run_scrape_pass(pool, &counter, &options, Utc::now().date_naive()).await?;

    if summary.failed > 0 {
        tracing::warn!(failed = summary.failed, "some offers could not be recorded");
    }
    println!("{}", summary_line(&summary));
    Ok(())
}

/// Copy each offer's `active_today` into today's ledger row.
///
/// # Errors
///
/// Returns an error if the snapshot statement fails.
pub(crate) async fn run_history_snapshot(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let today = Utc::now().date_naive();
    let written = adtrack_db::snapshot_today_counts(pool, today).await?;
    tracing::info!(%today, written, "history snapshot finished");
    println!("snapshot for {today}: {written} row(s) written");
    Ok(())
}
