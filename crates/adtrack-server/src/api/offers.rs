//! Offer CRUD handlers.
//!
//! - `GET    /api/v1/offers`
//! - `POST   /api/v1/offers` (create, then scrape once in the background)
//! - `GET    /api/v1/offers/{id}`
//! - `PATCH  /api/v1/offers/{id}`
//! - `DELETE /api/v1/offers/{id}`
//! - `PUT    /api/v1/offers/{id}/experiment`
//! - `PUT    /api/v1/offers/{id}/creative`

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use adtrack_core::{
    blank_to_none, format_locale_date, validate_languages, validate_name, validate_tags,
    ExperimentArm, NewOffer,
};
use adtrack_db::{OfferRow, OfferUpdate};
use adtrack_worker::scrape_and_record;

use crate::middleware::RequestId;

use super::{
    map_db_error, resolve_offer, today, validate_url, ApiError, ApiResponse, AppState,
};

// ---------------------------------------------------------------------------
// Request / response bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub(super) struct OfferItem {
    pub id: Uuid,
    pub name: String,
    pub tags: Vec<String>,
    pub languages: Vec<String>,
    pub source_url: Option<String>,
    pub site_url: Option<String>,
    pub checkout_url: Option<String>,
    pub created_on: NaiveDate,
    /// `created_on` rendered as `DD/MM/YYYY`.
    pub created_on_display: String,
    pub active_today: i32,
    pub active_yesterday: i32,
    pub variation: String,
    pub enabled: bool,
    pub category: Option<String>,
    pub experiment: Option<String>,
    pub creative: Option<String>,
}

impl From<OfferRow> for OfferItem {
    fn from(row: OfferRow) -> Self {
        Self {
            created_on_display: format_locale_date(row.created_on),
            id: row.id,
            name: row.name,
            tags: row.tags,
            languages: row.languages,
            source_url: row.source_url,
            site_url: row.site_url,
            checkout_url: row.checkout_url,
            created_on: row.created_on,
            active_today: row.active_today,
            active_yesterday: row.active_yesterday,
            variation: row.variation,
            enabled: row.enabled,
            category: row.category,
            experiment: row.experiment,
            creative: row.creative,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct CreateOfferRequest {
    pub name: String,
    pub tags: Vec<String>,
    pub languages: Vec<String>,
    pub source_url: Option<String>,
    pub site_url: Option<String>,
    pub checkout_url: Option<String>,
    pub category: Option<String>,
}

// Option<Option<T>>: outer None = "not in request" (keep current),
// Some(None) = "explicitly cleared", Some(Some(v)) = "set to value".
#[allow(clippy::option_option)]
#[derive(Debug, Deserialize)]
pub(super) struct UpdateOfferRequest {
    pub name: Option<String>,
    pub tags: Option<Vec<String>>,
    pub languages: Option<Vec<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub source_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub site_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub checkout_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub category: Option<Option<String>>,
    pub enabled: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ExperimentRequest {
    pub experiment: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct CreativeRequest {
    pub creative: Option<String>,
}

/// Distinguishes an explicit `null` (`Some(None)`) from a missing field (`None`).
#[allow(clippy::option_option)]
fn double_option<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

fn core_validation(req_id: &str, e: &adtrack_core::CoreError) -> ApiError {
    ApiError::new(req_id, "validation_error", e.to_string())
}

fn validate_urls<'a>(
    req_id: &str,
    urls: impl IntoIterator<Item = (&'static str, Option<&'a str>)>,
) -> Result<(), ApiError> {
    for (field, value) in urls {
        if let Some(value) = value {
            validate_url(req_id, field, value)?;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

pub(super) async fn list_offers(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<OfferItem>>>, ApiError> {
    let rows = adtrack_db::list_offers(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse::new(
        rows.into_iter().map(OfferItem::from).collect(),
        req_id.0,
    )))
}

/// POST /api/v1/offers: register an offer and kick off its first scrape.
pub(super) async fn create_offer(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<CreateOfferRequest>,
) -> Result<(StatusCode, Json<ApiResponse<OfferItem>>), ApiError> {
    let rid = &req_id.0;

    let offer = NewOffer {
        name: body.name,
        tags: body.tags,
        languages: body.languages,
        source_url: body.source_url,
        site_url: body.site_url,
        checkout_url: body.checkout_url,
        category: body.category,
    }
    .validated()
    .map_err(|e| core_validation(rid, &e))?;

    validate_urls(
        rid,
        [
            ("source_url", offer.source_url.as_deref()),
            ("site_url", offer.site_url.as_deref()),
            ("checkout_url", offer.checkout_url.as_deref()),
        ],
    )?;

    let day = today();
    let row = adtrack_db::create_offer(&state.pool, &offer, day)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    tracing::info!(offer_id = %row.id, offer = %row.name, "offer created");

    if let Some(url) = row.source_url.clone() {
        let pool = state.pool.clone();
        let counter = state.counter.clone();
        let offer_id = row.id;
        tokio::spawn(async move {
            match scrape_and_record(&pool, &counter, offer_id, &url, day).await {
                Ok(outcome) => {
                    tracing::info!(%offer_id, count = ?outcome.count(), "initial scrape finished");
                }
                Err(e) => tracing::warn!(%offer_id, error = %e, "initial scrape failed"),
            }
        });
    }

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(OfferItem::from(row), req_id.0)),
    ))
}

pub(super) async fn get_offer(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<OfferItem>>, ApiError> {
    let row = resolve_offer(&state.pool, id, &req_id.0).await?;
    Ok(Json(ApiResponse::new(OfferItem::from(row), req_id.0)))
}

/// PATCH /api/v1/offers/{id}: sparse update of offer metadata.
pub(super) async fn update_offer(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateOfferRequest>,
) -> Result<Json<ApiResponse<OfferItem>>, ApiError> {
    let rid = &req_id.0;

    let name = body
        .name
        .as_deref()
        .map(validate_name)
        .transpose()
        .map_err(|e| core_validation(rid, &e))?;
    let tags = body
        .tags
        .map(validate_tags)
        .transpose()
        .map_err(|e| core_validation(rid, &e))?;
    let languages = body
        .languages
        .map(validate_languages)
        .transpose()
        .map_err(|e| core_validation(rid, &e))?;

    let update = OfferUpdate {
        name,
        tags,
        languages,
        source_url: body.source_url.map(blank_to_none),
        site_url: body.site_url.map(blank_to_none),
        checkout_url: body.checkout_url.map(blank_to_none),
        category: body.category.map(blank_to_none),
        enabled: body.enabled,
    };

    validate_urls(
        rid,
        [
            ("source_url", update.source_url.as_ref().and_then(Option::as_deref)),
            ("site_url", update.site_url.as_ref().and_then(Option::as_deref)),
            (
                "checkout_url",
                update.checkout_url.as_ref().and_then(Option::as_deref),
            ),
        ],
    )?;

    let row = adtrack_db::update_offer(&state.pool, id, &update)
        .await
        .map_err(|e| match e {
            adtrack_db::DbError::NotFound => {
                ApiError::new(rid, "not_found", format!("offer '{id}' not found"))
            }
            other => map_db_error(rid.clone(), &other),
        })?;

    Ok(Json(ApiResponse::new(OfferItem::from(row), req_id.0)))
}

pub(super) async fn delete_offer(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    adtrack_db::delete_offer(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    tracing::info!(offer_id = %id, "offer deleted");

    Ok(Json(ApiResponse::new(
        serde_json::json!({ "deleted": true }),
        req_id.0,
    )))
}

/// PUT /api/v1/offers/{id}/experiment: tag with arm `A`/`B`, or clear with `null`.
pub(super) async fn set_experiment(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
    Json(body): Json<ExperimentRequest>,
) -> Result<Json<ApiResponse<OfferItem>>, ApiError> {
    let rid = &req_id.0;

    let arm = blank_to_none(body.experiment)
        .map(|raw| raw.parse::<ExperimentArm>())
        .transpose()
        .map_err(|e| core_validation(rid, &e))?;

    adtrack_db::set_offer_experiment(&state.pool, id, arm)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    let row = resolve_offer(&state.pool, id, rid).await?;
    Ok(Json(ApiResponse::new(OfferItem::from(row), req_id.0)))
}

pub(super) async fn set_creative(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
    Json(body): Json<CreativeRequest>,
) -> Result<Json<ApiResponse<OfferItem>>, ApiError> {
    let rid = &req_id.0;
    let creative = blank_to_none(body.creative);

    adtrack_db::set_offer_creative(&state.pool, id, creative.as_deref())
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    let row = resolve_offer(&state.pool, id, rid).await?;
    Ok(Json(ApiResponse::new(OfferItem::from(row), req_id.0)))
}
