//! Database operations for the `offers` table.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use adtrack_core::{ExperimentArm, NewOffer, NO_BASELINE_VARIATION};

use crate::DbError;

// ---------------------------------------------------------------------------
// Row type
// ---------------------------------------------------------------------------

/// A row from the `offers` table.
///
/// `active_today`, `active_yesterday`, and `variation` are denormalized from
/// `offer_history` and only ever written by [`crate::record_observation`].
/// `last_observed_on` is the day those counts were last observed.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OfferRow {
    pub id: Uuid,
    pub name: String,
    pub tags: Vec<String>,
    pub languages: Vec<String>,
    pub source_url: Option<String>,
    pub site_url: Option<String>,
    pub checkout_url: Option<String>,
    pub created_on: NaiveDate,
    pub active_today: i32,
    pub active_yesterday: i32,
    pub variation: String,
    pub enabled: bool,
    pub category: Option<String>,
    pub experiment: Option<String>,
    pub creative: Option<String>,
    pub last_observed_on: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const OFFER_COLUMNS: &str = "id, name, tags, languages, source_url, site_url, checkout_url, \
     created_on, active_today, active_yesterday, variation, enabled, category, experiment, \
     creative, last_observed_on, created_at, updated_at";

/// Partial update for an offer (PATCH semantics).
///
/// Outer `None` keeps the current value; `Some(None)` clears a nullable column.
#[allow(clippy::option_option)]
#[derive(Debug, Clone, Default)]
pub struct OfferUpdate {
    pub name: Option<String>,
    pub tags: Option<Vec<String>>,
    pub languages: Option<Vec<String>>,
    pub source_url: Option<Option<String>>,
    pub site_url: Option<Option<String>>,
    pub checkout_url: Option<Option<String>>,
    pub category: Option<Option<String>>,
    pub enabled: Option<bool>,
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Inserts a new offer with zero counts, `"0%"` variation, and monitoring on.
///
/// The id is generated here. `created_on` is the calendar day the offer is
/// registered on.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails (including a duplicate name).
pub async fn create_offer(
    pool: &PgPool,
    offer: &NewOffer,
    created_on: NaiveDate,
) -> Result<OfferRow, DbError> {
    let id = Uuid::new_v4();

    let row = sqlx::query_as::<_, OfferRow>(&format!(
        "INSERT INTO offers \
             (id, name, tags, languages, source_url, site_url, checkout_url, category, \
              created_on, active_today, active_yesterday, variation, enabled) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 0, 0, $10, true) \
         RETURNING {OFFER_COLUMNS}"
    ))
    .bind(id)
    .bind(&offer.name)
    .bind(&offer.tags)
    .bind(&offer.languages)
    .bind(&offer.source_url)
    .bind(&offer.site_url)
    .bind(&offer.checkout_url)
    .bind(&offer.category)
    .bind(created_on)
    .bind(NO_BASELINE_VARIATION)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Fetches a single offer by id, or `None` if it does not exist.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_offer(pool: &PgPool, id: Uuid) -> Result<Option<OfferRow>, DbError> {
    let row = sqlx::query_as::<_, OfferRow>(&format!(
        "SELECT {OFFER_COLUMNS} FROM offers WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Returns every offer, ordered by creation time then name.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_offers(pool: &PgPool) -> Result<Vec<OfferRow>, DbError> {
    let rows = sqlx::query_as::<_, OfferRow>(&format!(
        "SELECT {OFFER_COLUMNS} FROM offers ORDER BY created_at, name"
    ))
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns enabled offers that have a non-blank source URL to scrape, ordered
/// by name.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_scrape_targets(pool: &PgPool) -> Result<Vec<OfferRow>, DbError> {
    let rows = sqlx::query_as::<_, OfferRow>(&format!(
        "SELECT {OFFER_COLUMNS} FROM offers \
         WHERE enabled = true AND source_url IS NOT NULL AND btrim(source_url) <> '' \
         ORDER BY name"
    ))
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns the other offers sharing `category`, excluding `exclude_id`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_offers_in_category(
    pool: &PgPool,
    category: &str,
    exclude_id: Uuid,
) -> Result<Vec<OfferRow>, DbError> {
    let rows = sqlx::query_as::<_, OfferRow>(&format!(
        "SELECT {OFFER_COLUMNS} FROM offers \
         WHERE category = $1 AND id <> $2 \
         ORDER BY name"
    ))
    .bind(category)
    .bind(exclude_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Applies a partial update and returns the updated row.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no offer has `id`, or [`DbError::Sqlx`]
/// if the update fails.
pub async fn update_offer(
    pool: &PgPool,
    id: Uuid,
    update: &OfferUpdate,
) -> Result<OfferRow, DbError> {
    // Nullable columns need "was supplied" flags to tell "keep" from "clear".
    let source_url_supplied = update.source_url.is_some();
    let site_url_supplied = update.site_url.is_some();
    let checkout_url_supplied = update.checkout_url.is_some();
    let category_supplied = update.category.is_some();

    let row = sqlx::query_as::<_, OfferRow>(&format!(
        "UPDATE offers \
         SET name         = COALESCE($2, name), \
             tags         = COALESCE($3, tags), \
             languages    = COALESCE($4, languages), \
             source_url   = CASE WHEN $5::BOOL THEN $6 ELSE source_url END, \
             site_url     = CASE WHEN $7::BOOL THEN $8 ELSE site_url END, \
             checkout_url = CASE WHEN $9::BOOL THEN $10 ELSE checkout_url END, \
             category     = CASE WHEN $11::BOOL THEN $12 ELSE category END, \
             enabled      = COALESCE($13, enabled), \
             updated_at   = NOW() \
         WHERE id = $1 \
         RETURNING {OFFER_COLUMNS}"
    ))
    .bind(id)
    .bind(update.name.as_deref())
    .bind(update.tags.as_deref())
    .bind(update.languages.as_deref())
    .bind(source_url_supplied)
    .bind(update.source_url.clone().flatten())
    .bind(site_url_supplied)
    .bind(update.site_url.clone().flatten())
    .bind(checkout_url_supplied)
    .bind(update.checkout_url.clone().flatten())
    .bind(category_supplied)
    .bind(update.category.clone().flatten())
    .bind(update.enabled)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Turns monitoring on or off for an offer.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no offer has `id`, or [`DbError::Sqlx`]
/// if the update fails.
pub async fn set_offer_enabled(pool: &PgPool, id: Uuid, enabled: bool) -> Result<(), DbError> {
    let result = sqlx::query("UPDATE offers SET enabled = $2, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .bind(enabled)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// Tags an offer with an experiment arm, or clears it with `None`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no offer has `id`, or [`DbError::Sqlx`]
/// if the update fails.
pub async fn set_offer_experiment(
    pool: &PgPool,
    id: Uuid,
    arm: Option<ExperimentArm>,
) -> Result<(), DbError> {
    let result =
        sqlx::query("UPDATE offers SET experiment = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(arm.map(ExperimentArm::as_str))
            .execute(pool)
            .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// Stores the creative copy attached to an experiment offer.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no offer has `id`, or [`DbError::Sqlx`]
/// if the update fails.
pub async fn set_offer_creative(
    pool: &PgPool,
    id: Uuid,
    creative: Option<&str>,
) -> Result<(), DbError> {
    let result = sqlx::query("UPDATE offers SET creative = $2, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .bind(creative)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// Deletes an offer. Its history rows go with it via `ON DELETE CASCADE`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no offer has `id`, or [`DbError::Sqlx`]
/// if the delete fails.
pub async fn delete_offer(pool: &PgPool, id: Uuid) -> Result<(), DbError> {
    let result = sqlx::query("DELETE FROM offers WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}
