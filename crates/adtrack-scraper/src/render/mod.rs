//! Page renderers: load a URL and hand back its HTML.

use std::sync::Arc;

use async_trait::async_trait;

use adtrack_core::AppConfig;

use crate::error::ScraperError;
use crate::page::RenderedPage;

mod http;
mod remote;

pub use http::HttpRenderer;
pub use remote::{RegionSelection, RemoteBrowserRenderer};

/// Loads a page and returns its rendered HTML.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// # Errors
    ///
    /// Returns [`ScraperError`] when the page cannot be loaded or rendered.
    async fn render(&self, url: &str) -> Result<RenderedPage, ScraperError>;
}

/// Chooses the renderer for this deployment.
///
/// A configured browser API selects [`RemoteBrowserRenderer`]; otherwise pages
/// are fetched as plain HTML with [`HttpRenderer`].
///
/// # Errors
///
/// Returns [`ScraperError::Http`] if the HTTP client cannot be built, or
/// [`ScraperError::InvalidUrl`] for a malformed browser API URL.
pub fn build_renderer(config: &AppConfig) -> Result<Arc<dyn PageRenderer>, ScraperError> {
    if let Some(api) = &config.browser_api {
        tracing::info!(base_url = %api.base_url, "using remote browser renderer");
        let renderer = RemoteBrowserRenderer::new(
            api,
            RegionSelection {
                label: config.scraper_region_label.clone(),
                name: config.scraper_region_name.clone(),
            },
            config.scraper_settle_ms,
            config.scraper_request_timeout_secs,
        )?;
        return Ok(Arc::new(renderer));
    }

    tracing::info!("no browser API configured; using plain HTTP renderer");
    let renderer = HttpRenderer::new(
        config.scraper_request_timeout_secs,
        &config.scraper_user_agent,
    )?;
    Ok(Arc::new(renderer))
}

pub(crate) fn parse_url(url: &str) -> Result<reqwest::Url, ScraperError> {
    let parsed = reqwest::Url::parse(url).map_err(|e| ScraperError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ScraperError::InvalidUrl {
            url: url.to_string(),
            reason: format!("unsupported scheme '{}'", parsed.scheme()),
        });
    }
    Ok(parsed)
}
