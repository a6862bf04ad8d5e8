//! Database operations for the `offer_history` ledger.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use adtrack_core::DayCount;

use crate::DbError;

/// A row from the `offer_history` table. One per offer per calendar day.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct HistoryRow {
    pub id: i64,
    pub offer_id: Uuid,
    pub day: NaiveDate,
    pub active_ads: i32,
    pub notes: Option<String>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl HistoryRow {
    #[must_use]
    pub fn day_count(&self) -> DayCount {
        DayCount::new(self.day, self.active_ads)
    }
}

/// Inserts or overwrites the count for `(offer_id, day)`.
///
/// Re-running for the same day replaces the count and leaves annotations
/// alone, so at most one row per offer per day ever exists.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on database failure (including an unknown
/// `offer_id`, which violates the foreign key).
pub async fn upsert_history_day(
    pool: &PgPool,
    offer_id: Uuid,
    day: NaiveDate,
    active_ads: i32,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO offer_history (offer_id, day, active_ads) \
         VALUES ($1, $2, $3) \
         ON CONFLICT (offer_id, day) DO UPDATE \
         SET active_ads = EXCLUDED.active_ads, \
             updated_at = NOW()",
    )
    .bind(offer_id)
    .bind(day)
    .bind(active_ads)
    .execute(pool)
    .await?;

    Ok(())
}

/// Count recorded for `(offer_id, day)`, or `None` when no row exists.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_history_count(
    pool: &PgPool,
    offer_id: Uuid,
    day: NaiveDate,
) -> Result<Option<i32>, DbError> {
    let count = sqlx::query_scalar::<_, i32>(
        "SELECT active_ads FROM offer_history WHERE offer_id = $1 AND day = $2",
    )
    .bind(offer_id)
    .bind(day)
    .fetch_optional(pool)
    .await?;

    Ok(count)
}

/// The full ledger for one offer, oldest day first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_offer_history(pool: &PgPool, offer_id: Uuid) -> Result<Vec<HistoryRow>, DbError> {
    let rows = sqlx::query_as::<_, HistoryRow>(
        "SELECT id, offer_id, day, active_ads, notes, tags, created_at, updated_at \
         FROM offer_history \
         WHERE offer_id = $1 \
         ORDER BY day ASC",
    )
    .bind(offer_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Every ledger row across all offers, grouped by offer then ordered by day.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_all_history(pool: &PgPool) -> Result<Vec<HistoryRow>, DbError> {
    let rows = sqlx::query_as::<_, HistoryRow>(
        "SELECT id, offer_id, day, active_ads, notes, tags, created_at, updated_at \
         FROM offer_history \
         ORDER BY offer_id, day ASC",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Sets notes and tags on every history row of an offer.
///
/// Returns the number of rows touched; zero when the offer has no history.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn set_history_annotations(
    pool: &PgPool,
    offer_id: Uuid,
    notes: Option<&str>,
    tags: &[String],
) -> Result<u64, DbError> {
    let result = sqlx::query(
        "UPDATE offer_history \
         SET notes = $2, tags = $3, updated_at = NOW() \
         WHERE offer_id = $1",
    )
    .bind(offer_id)
    .bind(notes)
    .bind(tags)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Copies every offer's denormalized `active_today` into the ledger for `day`.
///
/// Only offers whose count was observed on `day` are copied; an offer whose
/// scrape failed keeps its earlier count on the row and gets no ledger entry.
/// Zero counts are skipped as well. Returns the number of rows written.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the statement fails.
pub async fn snapshot_today_counts(pool: &PgPool, day: NaiveDate) -> Result<u64, DbError> {
    let result = sqlx::query(
        "INSERT INTO offer_history (offer_id, day, active_ads) \
         SELECT id, $1, active_today FROM offers \
         WHERE active_today > 0 AND last_observed_on = $1 \
         ON CONFLICT (offer_id, day) DO UPDATE \
         SET active_ads = EXCLUDED.active_ads, \
             updated_at = NOW()",
    )
    .bind(day)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}
