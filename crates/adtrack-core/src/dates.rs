//! Calendar-date helpers.
//!
//! Offer creation dates are calendar days, not timestamps. Older records were
//! written in the `DD/MM/YYYY` locale form, so parsing accepts both that and ISO.

use chrono::NaiveDate;

use crate::CoreError;

/// Parse a calendar date written as `YYYY-MM-DD` or `DD/MM/YYYY`.
///
/// # Errors
///
/// Returns [`CoreError::InvalidDate`] if the input matches neither form.
pub fn parse_calendar_date(raw: &str) -> Result<NaiveDate, CoreError> {
    let trimmed = raw.trim();
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(trimmed, "%d/%m/%Y"))
        .map_err(|_| CoreError::InvalidDate(raw.to_string()))
}

/// Render a date in the `DD/MM/YYYY` locale form.
#[must_use]
pub fn format_locale_date(day: NaiveDate) -> String {
    day.format("%d/%m/%Y").to_string()
}
