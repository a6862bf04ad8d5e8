//! Pull the active-ad count out of a rendered ad-library page.
//!
//! The library shows a heading such as `~1.240 resultados` once the search
//! settles. Extraction looks at headings first, then generic inline/block
//! text, then the whole document, and returns the first count it can parse.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::page::RenderedPage;

/// Turns a rendered page into an active-ad count.
pub trait Extractor: Send + Sync {
    /// `None` when the page carries no recognizable count.
    fn extract(&self, page: &RenderedPage) -> Option<u32>;
}

static RESULT_COUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)~?\s*(\d{1,3}(?:[.,]\d{3})+|\d+)\s+(?:results?|resultados?)\b")
        .expect("result-count regex is valid")
});

const HEADING_SELECTORS: &str = r#"[role="heading"], h1, h2, h3, h4, h5, h6"#;
const TEXT_SELECTORS: &str = "span, div";

/// Parses the first `~N result(s)` / `~N resultado(s)` phrase in `text`.
///
/// Thousands separators (`.` or `,`) inside the number are ignored.
#[must_use]
pub fn parse_result_count(text: &str) -> Option<u32> {
    let caps = RESULT_COUNT.captures(text)?;
    let digits: String = caps[1].chars().filter(char::is_ascii_digit).collect();
    digits.parse().ok()
}

/// Default [`Extractor`] for ad-library search pages.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultCountExtractor;

impl ResultCountExtractor {
    fn first_in(document: &Html, selectors: &str) -> Option<u32> {
        let selector = Selector::parse(selectors).ok()?;
        document
            .select(&selector)
            .find_map(|el| parse_result_count(&element_text(el)))
    }
}

impl Extractor for ResultCountExtractor {
    fn extract(&self, page: &RenderedPage) -> Option<u32> {
        let document = Html::parse_document(&page.html);

        Self::first_in(&document, HEADING_SELECTORS)
            .or_else(|| Self::first_in(&document, TEXT_SELECTORS))
            .or_else(|| parse_result_count(&element_text(document.root_element())))
    }
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
#[path = "extract_test.rs"]
mod tests;
