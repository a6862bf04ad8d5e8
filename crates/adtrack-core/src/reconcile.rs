//! Arithmetic behind turning one observed count into offer/ledger updates.
//!
//! The database layer executes a [`ReconcilePlan`] inside a single
//! transaction; nothing here touches storage.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::CoreError;

/// Variation reported when there is no baseline to compare against.
pub const NO_BASELINE_VARIATION: &str = "0%";

/// Values to write for one observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilePlan {
    pub active_today: i32,
    pub active_yesterday: i32,
    pub variation: String,
}

/// Percentage change from `yesterday` to `today`, rendered with one decimal.
///
/// A zero `yesterday` means "no baseline" and yields [`NO_BASELINE_VARIATION`]
/// instead of dividing by zero. Rounding is half away from zero.
#[must_use]
pub fn format_variation(today: i32, yesterday: i32) -> String {
    if yesterday == 0 {
        return NO_BASELINE_VARIATION.to_string();
    }

    let delta = Decimal::from(i64::from(today) - i64::from(yesterday));
    let pct = delta * Decimal::from(100) / Decimal::from(yesterday);
    let mut rounded = pct.round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(1);
    format!("{rounded}%")
}

/// Decide what a reconciliation run should write.
///
/// `observed` is `None` when the scrape produced no usable number; in that
/// case nothing is written at all, so a failed scrape can never be recorded as
/// a genuine zero.
///
/// # Errors
///
/// Returns [`CoreError::CountOutOfRange`] if `observed` is negative or does
/// not fit the storage column.
pub fn plan_reconciliation(
    observed: Option<i64>,
    yesterday: i32,
) -> Result<Option<ReconcilePlan>, CoreError> {
    let Some(observed) = observed else {
        return Ok(None);
    };

    let active_today = i32::try_from(observed)
        .ok()
        .filter(|v| *v >= 0)
        .ok_or(CoreError::CountOutOfRange(observed))?;
    let active_yesterday = yesterday.max(0);

    Ok(Some(ReconcilePlan {
        active_today,
        active_yesterday,
        variation: format_variation(active_today, active_yesterday),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variation_is_zero_percent_without_baseline() {
        assert_eq!(format_variation(75, 0), "0%");
        assert_eq!(format_variation(0, 0), "0%");
    }

    #[test]
    fn variation_growth_from_fifty_to_seventy_five() {
        assert_eq!(format_variation(75, 50), "50.0%");
    }

    #[test]
    fn variation_is_negative_on_decline() {
        assert_eq!(format_variation(20, 30), "-33.3%");
        assert_eq!(format_variation(0, 10), "-100.0%");
    }

    #[test]
    fn variation_rounds_half_away_from_zero() {
        // 1/8 = 12.5%, 1/16 = 6.25% -> 6.3%
        assert_eq!(format_variation(9, 8), "12.5%");
        assert_eq!(format_variation(17, 16), "6.3%");
        assert_eq!(format_variation(15, 16), "-6.3%");
    }

    #[test]
    fn variation_unchanged_is_zero_with_decimal() {
        assert_eq!(format_variation(40, 40), "0.0%");
    }

    #[test]
    fn absent_observation_plans_nothing() {
        assert_eq!(plan_reconciliation(None, 12), Ok(None));
    }

    #[test]
    fn observation_plans_today_yesterday_and_variation() {
        let plan = plan_reconciliation(Some(75), 50)
            .expect("in range")
            .expect("plan");
        assert_eq!(
            plan,
            ReconcilePlan {
                active_today: 75,
                active_yesterday: 50,
                variation: "50.0%".to_string(),
            }
        );
    }

    #[test]
    fn zero_observation_is_still_written() {
        let plan = plan_reconciliation(Some(0), 8).unwrap().unwrap();
        assert_eq!(plan.active_today, 0);
        assert_eq!(plan.variation, "-100.0%");
    }

    #[test]
    fn negative_or_huge_observation_is_rejected() {
        assert_eq!(
            plan_reconciliation(Some(-1), 0),
            Err(CoreError::CountOutOfRange(-1))
        );
        let huge = i64::from(i32::MAX) + 1;
        assert_eq!(
            plan_reconciliation(Some(huge), 0),
            Err(CoreError::CountOutOfRange(huge))
        );
    }
}
