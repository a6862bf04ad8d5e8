use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::CoreError;

pub const MAX_NAME_LEN: usize = 200;
pub const MAX_TAGS: usize = 10;
pub const MAX_LANGUAGES: usize = 4;

/// Input for creating a tracked offer.
///
/// Counts, variation, and the enabled flag are not part of the input: a new
/// offer always starts with zero counts, `"0%"` variation, and monitoring on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOffer {
    pub name: String,
    pub tags: Vec<String>,
    pub languages: Vec<String>,
    pub source_url: Option<String>,
    pub site_url: Option<String>,
    pub checkout_url: Option<String>,
    pub category: Option<String>,
}

impl NewOffer {
    /// Trim free-text fields and check the name, tag, and language bounds.
    ///
    /// Blank optional strings are normalized to `None`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] describing the first violated rule.
    pub fn validated(self) -> Result<Self, CoreError> {
        Ok(Self {
            name: validate_name(&self.name)?,
            tags: validate_tags(self.tags)?,
            languages: validate_languages(self.languages)?,
            source_url: blank_to_none(self.source_url),
            site_url: blank_to_none(self.site_url),
            checkout_url: blank_to_none(self.checkout_url),
            category: blank_to_none(self.category),
        })
    }
}

/// Trimmed offer name, 1 to [`MAX_NAME_LEN`] characters.
///
/// # Errors
///
/// Returns [`CoreError::Validation`] when the name is blank or too long.
pub fn validate_name(name: &str) -> Result<String, CoreError> {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > MAX_NAME_LEN {
        return Err(CoreError::Validation(format!(
            "name must be 1-{MAX_NAME_LEN} characters"
        )));
    }
    Ok(name.to_string())
}

/// # Errors
///
/// Returns [`CoreError::Validation`] for blank or duplicate tags, or a count
/// outside 1..=[`MAX_TAGS`].
pub fn validate_tags(tags: Vec<String>) -> Result<Vec<String>, CoreError> {
    normalize_labels("tags", tags, MAX_TAGS)
}

/// # Errors
///
/// Returns [`CoreError::Validation`] for blank or duplicate languages, or a
/// count outside 1..=[`MAX_LANGUAGES`].
pub fn validate_languages(languages: Vec<String>) -> Result<Vec<String>, CoreError> {
    normalize_labels("languages", languages, MAX_LANGUAGES)
}

fn normalize_labels(
    field: &str,
    values: Vec<String>,
    max: usize,
) -> Result<Vec<String>, CoreError> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(values.len());

    for value in values {
        let value = value.trim().to_string();
        if value.is_empty() {
            return Err(CoreError::Validation(format!(
                "{field} must not contain blank entries"
            )));
        }
        if !seen.insert(value.to_lowercase()) {
            return Err(CoreError::Validation(format!(
                "duplicate entry in {field}: '{value}'"
            )));
        }
        out.push(value);
    }

    if out.is_empty() || out.len() > max {
        return Err(CoreError::Validation(format!(
            "{field} must have between 1 and {max} entries, got {}",
            out.len()
        )));
    }

    Ok(out)
}

/// Trims an optional string and maps blank values to `None`.
#[must_use]
pub fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Arm of an A/B experiment an offer can be tagged with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ExperimentArm {
    A,
    B,
}

impl ExperimentArm {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ExperimentArm::A => "A",
            ExperimentArm::B => "B",
        }
    }
}

impl std::fmt::Display for ExperimentArm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ExperimentArm {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "A" | "a" => Ok(ExperimentArm::A),
            "B" | "b" => Ok(ExperimentArm::B),
            other => Err(CoreError::InvalidExperimentArm(other.to_string())),
        }
    }
}

#[cfg(test)]
#[path = "offers_test.rs"]
mod tests;
