use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use super::{parse_url, PageRenderer};
use crate::error::ScraperError;
use crate::page::RenderedPage;

/// Fetches pages with a plain GET. No JavaScript runs, so region selection is
/// not possible and client-rendered counts will be missing.
pub struct HttpRenderer {
    client: Client,
}

impl HttpRenderer {
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(timeout_secs: u64, user_agent: &str) -> Result<Self, ScraperError> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
        );
        headers.insert(
            reqwest::header::ACCEPT_LANGUAGE,
            reqwest::header::HeaderValue::from_static("pt-BR,pt;q=0.9,en;q=0.5"),
        );

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .default_headers(headers)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageRenderer for HttpRenderer {
    async fn render(&self, url: &str) -> Result<RenderedPage, ScraperError> {
        let parsed = parse_url(url)?;

        let response = self.client.get(parsed).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScraperError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let html = response.text().await?;
        if html.trim().is_empty() {
            return Err(ScraperError::EmptyBody {
                url: url.to_string(),
            });
        }

        tracing::debug!(url, bytes = html.len(), "page fetched");
        Ok(RenderedPage::new(url, html))
    }
}
