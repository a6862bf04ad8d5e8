use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use adtrack_core::{parse_calendar_date, validate_tags};
use adtrack_db::HistoryRow;

use crate::middleware::RequestId;

use super::{map_db_error, resolve_offer, ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct HistoryLookupQuery {
    pub id: Option<Uuid>,
    pub day: Option<String>,
}

/// Point lookup body, served bare as `{ "ativos": n }` for dashboard clients.
#[derive(Debug, Serialize)]
pub(super) struct HistoryCount {
    #[serde(rename = "ativos")]
    pub active_ads: i32,
}

#[derive(Debug, Serialize)]
pub(super) struct HistoryItem {
    pub day: NaiveDate,
    pub active_ads: i32,
    pub notes: Option<String>,
    pub tags: Vec<String>,
}

impl From<HistoryRow> for HistoryItem {
    fn from(row: HistoryRow) -> Self {
        Self {
            day: row.day,
            active_ads: row.active_ads,
            notes: row.notes,
            tags: row.tags,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct AnnotationsRequest {
    pub notes: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct AnnotationsUpdated {
    pub updated: u64,
}

/// GET /api/v1/history?id=<uuid>&day=<date>
///
/// Missing rows read as zero. `day` accepts `YYYY-MM-DD` or `DD/MM/YYYY`.
/// The body is not wrapped in the `data`/`meta` envelope.
pub(super) async fn lookup_history(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<HistoryLookupQuery>,
) -> Result<Json<HistoryCount>, ApiError> {
    let rid = &req_id.0;

    let (Some(id), Some(raw_day)) = (query.id, query.day.as_deref()) else {
        return Err(ApiError::new(
            rid,
            "bad_request",
            "query parameters 'id' and 'day' are required",
        ));
    };
    let day = parse_calendar_date(raw_day)
        .map_err(|e| ApiError::new(rid, "bad_request", e.to_string()))?;

    let count = adtrack_db::get_history_count(&state.pool, id, day)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?
        .unwrap_or(0);

    Ok(Json(HistoryCount { active_ads: count }))
}

pub(super) async fn list_offer_history(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<HistoryItem>>>, ApiError> {
    let offer = resolve_offer(&state.pool, id, &req_id.0).await?;

    let rows = adtrack_db::list_offer_history(&state.pool, offer.id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse::new(
        rows.into_iter().map(HistoryItem::from).collect(),
        req_id.0,
    )))
}

/// PUT /api/v1/offers/{id}/history/annotations: notes and tags apply to every
/// ledger row of the offer.
pub(super) async fn set_annotations(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
    Json(body): Json<AnnotationsRequest>,
) -> Result<Json<ApiResponse<AnnotationsUpdated>>, ApiError> {
    let rid = &req_id.0;
    let offer = resolve_offer(&state.pool, id, rid).await?;

    let tags = if body.tags.is_empty() {
        Vec::new()
    } else {
        validate_tags(body.tags).map_err(|e| ApiError::new(rid, "validation_error", e.to_string()))?
    };
    let notes = adtrack_core::blank_to_none(body.notes);

    let updated = adtrack_db::set_history_annotations(&state.pool, offer.id, notes.as_deref(), &tags)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok(Json(ApiResponse::new(
        AnnotationsUpdated { updated },
        req_id.0,
    )))
}
