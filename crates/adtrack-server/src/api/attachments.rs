use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{map_db_error, resolve_offer, ApiError, ApiResponse, AppState};

#[derive(Debug, Serialize)]
pub(super) struct StoredAttachment {
    pub path: String,
    pub bytes: usize,
}

/// PUT /api/v1/offers/{id}/attachments/{file_name}: raw request body is the file.
pub(super) async fn upload_attachment(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path((id, file_name)): Path<(Uuid, String)>,
    body: Bytes,
) -> Result<(StatusCode, Json<ApiResponse<StoredAttachment>>), ApiError> {
    let rid = &req_id.0;

    if body.is_empty() {
        return Err(ApiError::new(rid, "bad_request", "attachment body is empty"));
    }

    let offer = resolve_offer(&state.pool, id, rid).await?;
    let key = format!("{}/{}", offer.id, file_name);

    let path = state
        .attachments
        .put(&key, &body)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    tracing::info!(offer_id = %offer.id, path = %path, bytes = body.len(), "attachment uploaded");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(
            StoredAttachment {
                path,
                bytes: body.len(),
            },
            req_id.0,
        )),
    ))
}
