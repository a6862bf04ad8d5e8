//! On-demand scrape of a single page.

use axum::{extract::State, Extension, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use adtrack_worker::scrape_and_record;

use crate::middleware::RequestId;

use super::{resolve_offer, today, validate_url, ApiError, AppState};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ScrapeRequest {
    /// Offer to reconcile the count into. Without it the count is only reported.
    pub id: Option<Uuid>,
    pub source_url: String,
}

/// Served bare as `{ "ativosHoje": n | null }` for dashboard clients.
#[derive(Debug, Serialize)]
pub(super) struct ScrapeResult {
    #[serde(rename = "ativosHoje")]
    pub active_today: Option<u32>,
}

/// POST /api/v1/scrape
///
/// A page that cannot be read yields `null`, not an error, and writes nothing.
pub(super) async fn scrape_offer(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<ScrapeRequest>,
) -> Result<Json<ScrapeResult>, ApiError> {
    let rid = &req_id.0;
    let url = body.source_url.trim();
    validate_url(rid, "sourceUrl", url)?;

    let count = match body.id {
        Some(id) => {
            let offer = resolve_offer(&state.pool, id, rid).await?;
            scrape_and_record(&state.pool, &state.counter, offer.id, url, today())
                .await
                .map_err(|e| {
                    tracing::error!(offer_id = %offer.id, error = %e, "failed to record scrape");
                    ApiError::new(rid, "internal_error", "failed to record scrape")
                })?
                .count()
        }
        None => state.counter.count(url).await,
    };

    Ok(Json(ScrapeResult {
        active_today: count,
    }))
}
