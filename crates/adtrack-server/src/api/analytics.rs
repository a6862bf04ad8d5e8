//! Read-only insight endpoints built on the history ledger.
//!
//! All arithmetic lives in `adtrack_core::analytics`; handlers only load rows,
//! convert them to day counts and shape the response.

use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use adtrack_core::{
    average_seven_day_growth, calendar_cells, cumulative_variation, launch_series, peak_day,
    projection, seven_day_growth, trailing_series, CalendarCell, DayCount, SeriesOverrides,
};
use adtrack_db::{HistoryRow, OfferRow};

use crate::middleware::RequestId;

use super::{map_db_error, resolve_offer, today, ApiError, ApiResponse, AppState};

const DEFAULT_TRAILING_DAYS: u32 = 30;
const MAX_TRAILING_DAYS: u32 = 365;

#[derive(Debug, Deserialize)]
pub(super) struct InsightsQuery {
    pub days: Option<u32>,
}

#[derive(Debug, Serialize)]
pub(super) struct RelatedOffer {
    pub id: Uuid,
    pub name: String,
    pub active_today: i32,
    pub variation: String,
}

#[derive(Debug, Serialize)]
pub(super) struct OfferInsights {
    pub offer_id: Uuid,
    pub launch_series: Vec<DayCount>,
    pub trailing_series: Vec<DayCount>,
    pub peak: Option<DayCount>,
    pub projection: i64,
    pub seven_day_growth: Option<f64>,
    pub cumulative_variation: String,
    pub related: Vec<RelatedOffer>,
}

#[derive(Debug, Serialize)]
pub(super) struct OfferCalendar {
    pub offer_id: Uuid,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub cells: Vec<CalendarCell>,
}

#[derive(Debug, Serialize)]
pub(super) struct AnalyticsSummary {
    pub offers: usize,
    pub enabled_offers: usize,
    pub total_active_today: i64,
    pub total_active_yesterday: i64,
    pub average_seven_day_growth: Option<f64>,
}

fn overrides_for(offer: &OfferRow) -> SeriesOverrides {
    SeriesOverrides::from_counts(offer.active_today, offer.active_yesterday)
}

/// Ledger rows grouped per offer, each group in day order.
pub(super) fn history_by_offer(rows: Vec<HistoryRow>) -> HashMap<Uuid, Vec<DayCount>> {
    let mut grouped: HashMap<Uuid, Vec<DayCount>> = HashMap::new();
    for row in rows {
        grouped.entry(row.offer_id).or_default().push(row.day_count());
    }
    for days in grouped.values_mut() {
        days.sort_by_key(|d| d.day);
    }
    grouped
}

/// GET /api/v1/offers/{id}/insights?days=<n>
pub(super) async fn offer_insights(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
    Query(query): Query<InsightsQuery>,
) -> Result<Json<ApiResponse<OfferInsights>>, ApiError> {
    let rid = &req_id.0;

    let days = query.days.unwrap_or(DEFAULT_TRAILING_DAYS);
    if days == 0 || days > MAX_TRAILING_DAYS {
        return Err(ApiError::new(
            rid,
            "validation_error",
            format!("'days' must be between 1 and {MAX_TRAILING_DAYS}"),
        ));
    }

    let offer = resolve_offer(&state.pool, id, rid).await?;
    let history: Vec<DayCount> = adtrack_db::list_offer_history(&state.pool, offer.id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?
        .iter()
        .map(HistoryRow::day_count)
        .collect();

    let day = today();
    let overrides = overrides_for(&offer);
    let launch = launch_series(offer.created_on, &history, day, overrides);
    let trailing = trailing_series(&history, day, days, overrides);

    let related = match offer.category.as_deref() {
        Some(category) => adtrack_db::list_offers_in_category(&state.pool, category, offer.id)
            .await
            .map_err(|e| map_db_error(rid.clone(), &e))?
            .into_iter()
            .map(|o| RelatedOffer {
                id: o.id,
                name: o.name,
                active_today: o.active_today,
                variation: o.variation,
            })
            .collect(),
        None => Vec::new(),
    };

    let insights = OfferInsights {
        offer_id: offer.id,
        peak: peak_day(&launch),
        projection: projection(&trailing),
        seven_day_growth: seven_day_growth(&trailing),
        cumulative_variation: cumulative_variation(&history),
        launch_series: launch,
        trailing_series: trailing,
        related,
    };

    Ok(Json(ApiResponse::new(insights, req_id.0)))
}

pub(super) async fn offer_calendar(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<OfferCalendar>>, ApiError> {
    let offer = resolve_offer(&state.pool, id, &req_id.0).await?;
    let history: Vec<DayCount> = adtrack_db::list_offer_history(&state.pool, offer.id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .iter()
        .map(HistoryRow::day_count)
        .collect();

    let calendar = OfferCalendar {
        offer_id: offer.id,
        start: history.first().map(|d| d.day),
        end: history.last().map(|d| d.day),
        cells: calendar_cells(&history),
    };

    Ok(Json(ApiResponse::new(calendar, req_id.0)))
}

/// GET /api/v1/analytics/summary: dashboard totals across every offer.
pub(super) async fn summary(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<AnalyticsSummary>>, ApiError> {
    let rid = &req_id.0;

    let offers = adtrack_db::list_offers(&state.pool)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;
    let history = history_by_offer(
        adtrack_db::list_all_history(&state.pool)
            .await
            .map_err(|e| map_db_error(rid.clone(), &e))?,
    );

    let day = today();
    let series: Vec<Vec<DayCount>> = offers
        .iter()
        .map(|offer| {
            let ledger = history.get(&offer.id).map_or(&[][..], Vec::as_slice);
            trailing_series(ledger, day, DEFAULT_TRAILING_DAYS, overrides_for(offer))
        })
        .collect();

    let summary = AnalyticsSummary {
        offers: offers.len(),
        enabled_offers: offers.iter().filter(|o| o.enabled).count(),
        total_active_today: offers.iter().map(|o| i64::from(o.active_today)).sum(),
        total_active_yesterday: offers.iter().map(|o| i64::from(o.active_yesterday)).sum(),
        average_seven_day_growth: average_seven_day_growth(series.iter().map(Vec::as_slice)),
    };

    Ok(Json(ApiResponse::new(summary, req_id.0)))
}
