//! Transactional write path that turns one scrape result into stored counts.

use chrono::{Duration, NaiveDate};
use sqlx::PgPool;
use uuid::Uuid;

use adtrack_core::{plan_reconciliation, ReconcilePlan};

use crate::DbError;

/// What [`record_observation`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    /// The offer row and the ledger were updated with this plan.
    Recorded(ReconcilePlan),
    /// The observation was absent; nothing was written.
    Skipped,
}

/// Record an observed active-ad count for `offer_id` on `day`.
///
/// Reads yesterday's ledger count (0 when absent), writes today/yesterday, the
/// formatted variation and `last_observed_on = day` onto the offer row, and
/// upserts the ledger row for `day`, all in one transaction. A `None`
/// observation writes nothing.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the offer does not exist,
/// [`DbError::Core`] if the count is out of range, or [`DbError::Sqlx`] on
/// database failure. On error the transaction is rolled back.
pub async fn record_observation(
    pool: &PgPool,
    offer_id: Uuid,
    observed: Option<i64>,
    day: NaiveDate,
) -> Result<RecordOutcome, DbError> {
    if observed.is_none() {
        tracing::debug!(%offer_id, %day, "no observation; skipping reconcile");
        return Ok(RecordOutcome::Skipped);
    }

    let mut tx = pool.begin().await?;

    let yesterday = day - Duration::days(1);
    let yesterday_count: i32 = sqlx::query_scalar::<_, i32>(
        "SELECT active_ads FROM offer_history WHERE offer_id = $1 AND day = $2",
    )
    .bind(offer_id)
    .bind(yesterday)
    .fetch_optional(&mut *tx)
    .await?
    .unwrap_or(0);

    let Some(plan) = plan_reconciliation(observed, yesterday_count)? else {
        return Ok(RecordOutcome::Skipped);
    };

    let updated = sqlx::query(
        "UPDATE offers \
         SET active_today = $2, active_yesterday = $3, variation = $4, \
             last_observed_on = $5, updated_at = NOW() \
         WHERE id = $1",
    )
    .bind(offer_id)
    .bind(plan.active_today)
    .bind(plan.active_yesterday)
    .bind(&plan.variation)
    .bind(day)
    .execute(&mut *tx)
    .await?;

    if updated.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    sqlx::query(
        "INSERT INTO offer_history (offer_id, day, active_ads) \
         VALUES ($1, $2, $3) \
         ON CONFLICT (offer_id, day) DO UPDATE \
         SET active_ads = EXCLUDED.active_ads, \
             updated_at = NOW()",
    )
    .bind(offer_id)
    .bind(day)
    .bind(plan.active_today)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(
        %offer_id,
        %day,
        active_today = plan.active_today,
        active_yesterday = plan.active_yesterday,
        variation = %plan.variation,
        "observation recorded"
    );

    Ok(RecordOutcome::Recorded(plan))
}
