use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use adtrack_core::BrowserApiConfig;

use super::{parse_url, PageRenderer};
use crate::error::ScraperError;
use crate::page::RenderedPage;

const REGION_MENU_WAIT_MS: u64 = 1000;
const REGION_APPLY_WAIT_MS: u64 = 5000;
const REGION_BUTTON_TIMEOUT_MS: u64 = 10_000;
const NAVIGATION_TIMEOUT_MS: u64 = 60_000;

/// Runs inside the remote browser. Inputs arrive through `context`; the
/// region clicks are best-effort and a failure there still returns the page.
const RENDER_FUNCTION: &str = r#"export default async function ({ page, context }) {
  const sleep = (ms) => new Promise((resolve) => setTimeout(resolve, ms));
  await page.goto(context.url, { waitUntil: "networkidle2", timeout: context.navigationTimeoutMs });
  await sleep(context.settleMs);
  try {
    await page.waitForSelector('div[role="button"]', { timeout: context.regionButtonTimeoutMs });
    for (const button of await page.$$('div[role="button"]')) {
      const text = await button.evaluate((el) => el.innerText);
      if (text && text.includes(context.regionLabel)) {
        await button.click();
        break;
      }
    }
    await sleep(context.regionMenuWaitMs);
    for (const option of await page.$$("span")) {
      const text = await option.evaluate((el) => el.innerText);
      if (text && text.includes(context.regionName)) {
        await option.click();
        break;
      }
    }
    await sleep(context.regionApplyWaitMs);
  } catch (e) {}
  return { data: await page.content(), type: "text/html" };
}"#;

/// Button label and option text used to pin the ad library to one country.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionSelection {
    pub label: String,
    pub name: String,
}

#[derive(Debug, Serialize)]
struct FunctionRequest<'a> {
    code: &'static str,
    context: FunctionContext<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FunctionContext<'a> {
    url: &'a str,
    settle_ms: u64,
    region_label: &'a str,
    region_name: &'a str,
    region_button_timeout_ms: u64,
    region_menu_wait_ms: u64,
    region_apply_wait_ms: u64,
    navigation_timeout_ms: u64,
}

/// Renders pages in a hosted headless browser through its `/function` API.
pub struct RemoteBrowserRenderer {
    client: Client,
    endpoint: reqwest::Url,
    region: RegionSelection,
    settle_ms: u64,
}

impl std::fmt::Debug for RemoteBrowserRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // endpoint carries the API token in its query string
        f.debug_struct("RemoteBrowserRenderer")
            .field("host", &self.endpoint.host_str())
            .field("region", &self.region)
            .field("settle_ms", &self.settle_ms)
            .finish_non_exhaustive()
    }
}

impl RemoteBrowserRenderer {
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidUrl`] if the API base URL does not parse,
    /// or [`ScraperError::Http`] if the HTTP client cannot be built.
    pub fn new(
        api: &BrowserApiConfig,
        region: RegionSelection,
        settle_ms: u64,
        timeout_secs: u64,
    ) -> Result<Self, ScraperError> {
        let endpoint = function_endpoint(&api.base_url, &api.token)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            endpoint,
            region,
            settle_ms,
        })
    }
}

fn function_endpoint(base_url: &str, token: &str) -> Result<reqwest::Url, ScraperError> {
    let mut endpoint = parse_url(&format!("{}/function", base_url.trim_end_matches('/')))
        .map_err(|_| ScraperError::InvalidUrl {
            url: base_url.to_string(),
            reason: "browser API base URL must be an absolute http(s) URL".to_string(),
        })?;
    endpoint.query_pairs_mut().append_pair("token", token);
    Ok(endpoint)
}

#[async_trait]
impl PageRenderer for RemoteBrowserRenderer {
    async fn render(&self, url: &str) -> Result<RenderedPage, ScraperError> {
        parse_url(url)?;

        let body = FunctionRequest {
            code: RENDER_FUNCTION,
            context: FunctionContext {
                url,
                settle_ms: self.settle_ms,
                region_label: &self.region.label,
                region_name: &self.region.name,
                region_button_timeout_ms: REGION_BUTTON_TIMEOUT_MS,
                region_menu_wait_ms: REGION_MENU_WAIT_MS,
                region_apply_wait_ms: REGION_APPLY_WAIT_MS,
                navigation_timeout_ms: NAVIGATION_TIMEOUT_MS,
            },
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&body)
            .send()
            .await
            .map_err(reqwest::Error::without_url)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScraperError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let html = response.text().await.map_err(reqwest::Error::without_url)?;
        if html.trim().is_empty() {
            return Err(ScraperError::EmptyBody {
                url: url.to_string(),
            });
        }

        tracing::debug!(url, bytes = html.len(), "page rendered remotely");
        Ok(RenderedPage::new(url, html))
    }
}
