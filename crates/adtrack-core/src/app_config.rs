use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Connection details for a remote browser-automation API.
///
/// The token travels as a `token` query parameter, so the full request URL
/// must never be logged.
#[derive(Clone)]
pub struct BrowserApiConfig {
    pub base_url: String,
    pub token: String,
}

impl std::fmt::Debug for BrowserApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrowserApiConfig")
            .field("base_url", &self.base_url)
            .field("token", &"[redacted]")
            .finish()
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub attachments_dir: PathBuf,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub scraper_request_timeout_secs: u64,
    pub scraper_user_agent: String,
    pub scraper_settle_ms: u64,
    pub scraper_inter_offer_delay_ms: u64,
    pub scraper_region_label: String,
    pub scraper_region_name: String,
    pub browser_api: Option<BrowserApiConfig>,
    pub scrape_cron: String,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("attachments_dir", &self.attachments_dir)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field(
                "scraper_request_timeout_secs",
                &self.scraper_request_timeout_secs,
            )
            .field("scraper_user_agent", &self.scraper_user_agent)
            .field("scraper_settle_ms", &self.scraper_settle_ms)
            .field(
                "scraper_inter_offer_delay_ms",
                &self.scraper_inter_offer_delay_ms,
            )
            .field("scraper_region_label", &self.scraper_region_label)
            .field("scraper_region_name", &self.scraper_region_name)
            .field("browser_api", &self.browser_api)
            .field("scrape_cron", &self.scrape_cron)
            .finish()
    }
}
