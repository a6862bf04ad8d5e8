use std::sync::Arc;

use adtrack_core::AppConfig;
use adtrack_scraper::{build_renderer, Extractor, PageRenderer, ResultCountExtractor};

use crate::error::WorkerError;

/// Renders an ad-library page and extracts its active-ad count.
#[derive(Clone)]
pub struct AdCounter {
    renderer: Arc<dyn PageRenderer>,
    extractor: Arc<dyn Extractor>,
}

impl AdCounter {
    #[must_use]
    pub fn new(renderer: Arc<dyn PageRenderer>, extractor: Arc<dyn Extractor>) -> Self {
        Self {
            renderer,
            extractor,
        }
    }

    /// Counter using the configured renderer and [`ResultCountExtractor`].
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::Scraper`] if the renderer cannot be built.
    pub fn from_config(config: &AppConfig) -> Result<Self, WorkerError> {
        let renderer = build_renderer(config)?;
        Ok(Self::new(renderer, Arc::new(ResultCountExtractor)))
    }

    /// Active-ad count shown at `url`, or `None` when it cannot be determined.
    ///
    /// Render failures and pages without a recognizable count are logged here
    /// and never surface as errors.
    pub async fn count(&self, url: &str) -> Option<u32> {
        let page = match self.renderer.render(url).await {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!(url, error = %e, "page render failed");
                return None;
            }
        };

        let count = self.extractor.extract(&page);
        if count.is_none() {
            tracing::warn!(url, "no result count found on page");
        }
        count
    }
}
