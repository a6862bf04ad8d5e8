use axum::{extract::State, Extension, Json};
use serde::Serialize;
use uuid::Uuid;

use adtrack_core::{
    best_per_experiment, experiment_outcome, ExperimentArm, ExperimentEntry, ExperimentOutcome,
};

use crate::middleware::RequestId;

use super::{analytics::history_by_offer, map_db_error, ApiError, ApiResponse, AppState};

#[derive(Debug, Serialize)]
pub(super) struct ExperimentOffer {
    pub offer_id: Uuid,
    pub name: String,
    pub arm: ExperimentArm,
    pub outcome: ExperimentOutcome,
}

#[derive(Debug, Serialize)]
pub(super) struct ExperimentsReport {
    pub offers: Vec<ExperimentOffer>,
    /// Highest-total completed offer for each arm, in arm order.
    pub best_per_arm: Vec<ExperimentEntry>,
    pub overall_best: Option<ExperimentEntry>,
}

/// GET /api/v1/experiments
///
/// Only offers whose ledger has reached the comparison length compete for
/// best-of-arm; the rest are reported as pending.
pub(super) async fn list_experiments(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<ExperimentsReport>>, ApiError> {
    let rid = &req_id.0;

    let offers = adtrack_db::list_offers(&state.pool)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;
    let history = history_by_offer(
        adtrack_db::list_all_history(&state.pool)
            .await
            .map_err(|e| map_db_error(rid.clone(), &e))?,
    );

    let mut report_offers = Vec::new();
    let mut completed = Vec::new();

    for offer in offers {
        let Some(raw_arm) = offer.experiment.as_deref() else {
            continue;
        };
        let arm = match raw_arm.parse::<ExperimentArm>() {
            Ok(arm) => arm,
            Err(e) => {
                tracing::warn!(offer_id = %offer.id, error = %e, "ignoring offer with unknown experiment arm");
                continue;
            }
        };

        let ledger = history.get(&offer.id).map_or(&[][..], Vec::as_slice);
        let outcome = experiment_outcome(ledger);

        if let ExperimentOutcome::Complete { total } = outcome {
            completed.push(ExperimentEntry {
                offer_id: offer.id,
                name: offer.name.clone(),
                arm,
                total,
            });
        }

        report_offers.push(ExperimentOffer {
            offer_id: offer.id,
            name: offer.name,
            arm,
            outcome,
        });
    }

    let ranking = best_per_experiment(&completed);
    let report = ExperimentsReport {
        offers: report_offers,
        best_per_arm: ranking.best_per_arm.into_values().collect(),
        overall_best: ranking.overall_best,
    };

    Ok(Json(ApiResponse::new(report, req_id.0)))
}
