//! Derived views over an offer's history ledger.
//!
//! Everything here is pure: callers load offers and history rows, convert them
//! to [`DayCount`]s, and get back gap-filled series and the simple insights
//! shown on the dashboard.

use std::collections::{BTreeMap, HashMap};

use chrono::{Duration, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use uuid::Uuid;

use crate::offers::ExperimentArm;

/// Number of days in the launch window charted for every offer.
pub const LAUNCH_WINDOW_DAYS: u32 = 15;

/// Days of history an experiment needs before its total is comparable.
pub const EXPERIMENT_MIN_DAYS: usize = 15;

const PROJECTION_SAMPLE: usize = 3;
const PROJECTION_HORIZON: i64 = 5;
const GROWTH_LOOKBACK: usize = 7;

/// One calendar day and the active-ad count observed for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DayCount {
    pub day: NaiveDate,
    pub count: i32,
}

impl DayCount {
    #[must_use]
    pub fn new(day: NaiveDate, count: i32) -> Self {
        Self { day, count }
    }
}

/// Denormalized today/yesterday counts stored on the offer row.
///
/// Zero is treated as "not set" so a stale zero never masks a ledger value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeriesOverrides {
    pub today: Option<i32>,
    pub yesterday: Option<i32>,
}

impl SeriesOverrides {
    #[must_use]
    pub fn from_counts(active_today: i32, active_yesterday: i32) -> Self {
        Self {
            today: Some(active_today).filter(|v| *v > 0),
            yesterday: Some(active_yesterday).filter(|v| *v > 0),
        }
    }
}

/// Gap-filled series for the first [`LAUNCH_WINDOW_DAYS`] days of an offer.
///
/// The window starts at `created_on`, or at the earliest history day if that
/// is older, and ends at `today` or the last window day, whichever comes
/// first. Days with no history row count as 0. When the window ends on
/// `today`, the last two entries take the offer's denormalized counts.
#[must_use]
pub fn launch_series(
    created_on: NaiveDate,
    history: &[DayCount],
    today: NaiveDate,
    overrides: SeriesOverrides,
) -> Vec<DayCount> {
    let start = history
        .iter()
        .map(|h| h.day)
        .min()
        .map_or(created_on, |earliest| earliest.min(created_on));
    let last_window_day = start + Duration::days(i64::from(LAUNCH_WINDOW_DAYS) - 1);
    let end = last_window_day.min(today);

    let mut series = fill_days(start, end, history);
    apply_overrides(&mut series, today, overrides);
    series
}

/// Gap-filled series for the `days` days ending on `today`.
#[must_use]
pub fn trailing_series(
    history: &[DayCount],
    today: NaiveDate,
    days: u32,
    overrides: SeriesOverrides,
) -> Vec<DayCount> {
    if days == 0 {
        return Vec::new();
    }
    let start = today - Duration::days(i64::from(days) - 1);

    let mut series = fill_days(start, today, history);
    apply_overrides(&mut series, today, overrides);
    series
}

fn fill_days(start: NaiveDate, end: NaiveDate, history: &[DayCount]) -> Vec<DayCount> {
    if start > end {
        return Vec::new();
    }

    let by_day: HashMap<NaiveDate, i32> = history.iter().map(|h| (h.day, h.count)).collect();

    start
        .iter_days()
        .take_while(|day| *day <= end)
        .map(|day| DayCount::new(day, by_day.get(&day).copied().unwrap_or(0)))
        .collect()
}

fn apply_overrides(series: &mut [DayCount], today: NaiveDate, overrides: SeriesOverrides) {
    let len = series.len();
    if len == 0 || series[len - 1].day != today {
        return;
    }
    if let Some(count) = overrides.today {
        series[len - 1].count = count;
    }
    if len >= 2 {
        if let Some(count) = overrides.yesterday {
            series[len - 2].count = count;
        }
    }
}

/// Day with the highest count; ties resolve to the earliest entry.
///
/// Returns `None` for an empty series or when every count is zero.
#[must_use]
pub fn peak_day(series: &[DayCount]) -> Option<DayCount> {
    let mut best: Option<DayCount> = None;
    for entry in series {
        let current_max = best.map_or(0, |b| b.count);
        if entry.count > current_max {
            best = Some(*entry);
        }
    }
    best
}

/// Naive five-day projection: `round(mean(last 3 counts) * 5)`.
///
/// Uses whatever is available when fewer than three entries exist; an empty
/// series projects 0. Rounds half away from zero.
#[must_use]
pub fn projection(series: &[DayCount]) -> i64 {
    let sample = &series[series.len().saturating_sub(PROJECTION_SAMPLE)..];
    if sample.is_empty() {
        return 0;
    }

    let sum: i64 = sample.iter().map(|d| i64::from(d.count.max(0))).sum();
    let n = i64::try_from(sample.len()).unwrap_or(1);
    // round(sum * H / n) for non-negative integers
    (2 * sum * PROJECTION_HORIZON + n) / (2 * n)
}

/// Percent change between the last entry and the entry seven days earlier.
///
/// `None` when the series is shorter than eight days or the base is zero.
#[must_use]
pub fn seven_day_growth(series: &[DayCount]) -> Option<f64> {
    if series.len() <= GROWTH_LOOKBACK {
        return None;
    }
    let last = series[series.len() - 1].count;
    let base = series[series.len() - 1 - GROWTH_LOOKBACK].count;
    if base == 0 {
        return None;
    }
    Some(f64::from(last - base) / f64::from(base) * 100.0)
}

/// Mean seven-day growth across every series that has one.
#[must_use]
pub fn average_seven_day_growth<'a, I>(all: I) -> Option<f64>
where
    I: IntoIterator<Item = &'a [DayCount]>,
{
    let growths: Vec<f64> = all.into_iter().filter_map(seven_day_growth).collect();
    if growths.is_empty() {
        return None;
    }
    let n = u32::try_from(growths.len()).unwrap_or(u32::MAX);
    Some(growths.iter().sum::<f64>() / f64::from(n))
}

/// Change from the first to the last ledger entry, as a one-decimal percent
/// without the `%` sign. A zero first entry is measured against 1.
#[must_use]
pub fn cumulative_variation(history: &[DayCount]) -> String {
    let (Some(first), Some(last)) = (history.first(), history.last()) else {
        return "0".to_string();
    };
    if history.len() < 2 {
        return "0".to_string();
    }

    let base = if first.count == 0 { 1 } else { first.count };
    let delta = Decimal::from(i64::from(last.count) - i64::from(first.count));
    let mut pct = (delta * Decimal::from(100) / Decimal::from(base))
        .round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero);
    pct.rescale(1);
    pct.to_string()
}

/// Heat class of one calendar cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HeatClass {
    Peak,
    Active,
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CalendarCell {
    pub day: NaiveDate,
    pub count: i32,
    pub heat: HeatClass,
}

/// Classify each ledger entry for the calendar heatmap.
///
/// Every entry equal to the (non-zero) maximum is a peak.
#[must_use]
pub fn calendar_cells(history: &[DayCount]) -> Vec<CalendarCell> {
    let max = history.iter().map(|h| h.count).max().unwrap_or(0);
    history
        .iter()
        .map(|h| {
            let heat = if max > 0 && h.count == max {
                HeatClass::Peak
            } else if h.count > 0 {
                HeatClass::Active
            } else {
                HeatClass::Empty
            };
            CalendarCell {
                day: h.day,
                count: h.count,
                heat,
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExperimentOutcome {
    Pending { days_recorded: usize },
    Complete { total: i64 },
}

/// Outcome of an experiment offer given its full ledger.
#[must_use]
pub fn experiment_outcome(history: &[DayCount]) -> ExperimentOutcome {
    if history.len() < EXPERIMENT_MIN_DAYS {
        return ExperimentOutcome::Pending {
            days_recorded: history.len(),
        };
    }
    ExperimentOutcome::Complete {
        total: ledger_total(history),
    }
}

/// Sum of every count in a ledger.
#[must_use]
pub fn ledger_total(history: &[DayCount]) -> i64 {
    history.iter().map(|h| i64::from(h.count)).sum()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExperimentEntry {
    pub offer_id: Uuid,
    pub name: String,
    pub arm: ExperimentArm,
    pub total: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExperimentRanking {
    pub best_per_arm: BTreeMap<ExperimentArm, ExperimentEntry>,
    pub overall_best: Option<ExperimentEntry>,
}

/// Pick the highest-total entry per arm, and the best across arms.
///
/// Ties keep the entry seen first.
#[must_use]
pub fn best_per_experiment(entries: &[ExperimentEntry]) -> ExperimentRanking {
    let mut best_per_arm: BTreeMap<ExperimentArm, ExperimentEntry> = BTreeMap::new();

    for entry in entries {
        match best_per_arm.get(&entry.arm) {
            Some(current) if current.total >= entry.total => {}
            _ => {
                best_per_arm.insert(entry.arm, entry.clone());
            }
        }
    }

    let mut overall_best: Option<ExperimentEntry> = None;
    for entry in best_per_arm.values() {
        if overall_best.as_ref().is_none_or(|b| entry.total > b.total) {
            overall_best = Some(entry.clone());
        }
    }

    ExperimentRanking {
        best_per_arm,
        overall_best,
    }
}

#[cfg(test)]
#[path = "analytics_test.rs"]
mod tests;
