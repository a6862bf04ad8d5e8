pub mod analytics;
pub mod app_config;
pub mod config;
pub mod dates;
pub mod offers;
pub mod reconcile;

use thiserror::Error;

pub use analytics::{
    average_seven_day_growth, best_per_experiment, calendar_cells, cumulative_variation,
    experiment_outcome, launch_series, ledger_total, peak_day, projection, seven_day_growth,
    trailing_series, CalendarCell, DayCount, ExperimentEntry, ExperimentOutcome,
    ExperimentRanking, HeatClass, SeriesOverrides, EXPERIMENT_MIN_DAYS, LAUNCH_WINDOW_DAYS,
};
pub use app_config::{AppConfig, BrowserApiConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use dates::{format_locale_date, parse_calendar_date};
pub use offers::{
    blank_to_none, validate_languages, validate_name, validate_tags, ExperimentArm, NewOffer,
};
pub use reconcile::{format_variation, plan_reconciliation, ReconcilePlan, NO_BASELINE_VARIATION};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("invalid calendar date: {0}")]
    InvalidDate(String),

    #[error("invalid experiment arm: {0}")]
    InvalidExperimentArm(String),

    #[error("active-ad count out of range: {0}")]
    CountOutOfRange(i64),
}
