//! Sample-history seeding for demos and local development.

use chrono::{Duration, NaiveDate};
use rand::Rng;
use sqlx::PgPool;

use adtrack_core::{format_variation, LAUNCH_WINDOW_DAYS};

use crate::{offers::list_offers, DbError};

/// Days at the start of the window that stay at zero, like a fresh launch.
const QUIET_DAYS: usize = 2;

/// Summary returned after seeding sample history.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub offers: usize,
    pub days_inserted: u64,
}

/// Generate `days` plausible daily counts.
///
/// The first [`QUIET_DAYS`] are zero. After that each day draws a base of
/// 10..60, grows it by up to 150% as the window advances, and applies ±20%
/// noise.
pub fn sample_counts<R: Rng + ?Sized>(days: usize, rng: &mut R) -> Vec<i32> {
    (0..days)
        .map(|i| {
            if i < QUIET_DAYS {
                return 0;
            }
            let base = f64::from(rng.random_range(10..60_i32));
            #[allow(clippy::cast_precision_loss)]
            let growth = (i as f64 * 0.3).min(1.5);
            let noise = (rng.random::<f64>() - 0.5) * 0.4;
            #[allow(clippy::cast_possible_truncation)]
            let count = (base * (1.0 + growth) * (1.0 + noise)).floor() as i32;
            count.max(0)
        })
        .collect()
}

/// Number of launch-window days that have elapsed between `created_on` and `today`.
#[must_use]
pub fn elapsed_window_days(created_on: NaiveDate, today: NaiveDate) -> usize {
    if created_on > today {
        return 0;
    }
    let elapsed = usize::try_from((today - created_on).num_days() + 1).unwrap_or(0);
    elapsed.min(LAUNCH_WINDOW_DAYS as usize)
}

/// Fill each offer's launch window with sample counts.
///
/// When the window ends on `today` (the offer is at most 15 days old), the
/// denormalized today/yesterday/variation fields are refreshed from the last
/// two seeded days and `last_observed_on` is set to `today`. Older offers keep
/// their current counts, since their window closed before `today`.
///
/// Days that already have a ledger row are left untouched.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any query fails.
pub async fn seed_sample_history(pool: &PgPool, today: NaiveDate) -> Result<SeedSummary, DbError> {
    let offers = list_offers(pool).await?;
    let mut summary = SeedSummary {
        offers: offers.len(),
        days_inserted: 0,
    };

    for offer in &offers {
        let days = elapsed_window_days(offer.created_on, today);
        // rand's thread RNG is not Send; draw everything before the first await.
        let counts = sample_counts(days, &mut rand::rng());

        let mut tx = pool.begin().await?;
        for (i, count) in counts.iter().enumerate() {
            let day = offer.created_on + Duration::days(i64::try_from(i).unwrap_or(0));
            let result = sqlx::query(
                "INSERT INTO offer_history (offer_id, day, active_ads) \
                 VALUES ($1, $2, $3) \
                 ON CONFLICT (offer_id, day) DO NOTHING",
            )
            .bind(offer.id)
            .bind(day)
            .bind(count)
            .execute(&mut *tx)
            .await?;
            summary.days_inserted += result.rows_affected();
        }

        let window_end = offer.created_on + Duration::days(i64::try_from(days).unwrap_or(0) - 1);
        if days > 0 && window_end == today {
            let yesterday = today - Duration::days(1);
            let active_today = fetch_count(&mut tx, offer.id, today).await?;
            let active_yesterday = fetch_count(&mut tx, offer.id, yesterday).await?;

            sqlx::query(
                "UPDATE offers \
                 SET active_today = $2, active_yesterday = $3, variation = $4, \
                     last_observed_on = $5, updated_at = NOW() \
                 WHERE id = $1",
            )
            .bind(offer.id)
            .bind(active_today)
            .bind(active_yesterday)
            .bind(format_variation(active_today, active_yesterday))
            .bind(today)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::info!(offer = %offer.name, days, "seeded sample history");
    }

    Ok(summary)
}

async fn fetch_count(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    offer_id: uuid::Uuid,
    day: NaiveDate,
) -> Result<i32, DbError> {
    let count = sqlx::query_scalar::<_, i32>(
        "SELECT active_ads FROM offer_history WHERE offer_id = $1 AND day = $2",
    )
    .bind(offer_id)
    .bind(day)
    .fetch_optional(&mut **tx)
    .await?;
    Ok(count.unwrap_or(0))
}
