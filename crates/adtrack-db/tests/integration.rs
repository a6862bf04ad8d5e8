//! Offline tests for adtrack-db pool configuration and row helpers.
//! These tests do not require a live database connection.

use adtrack_core::{AppConfig, DayCount, Environment};
use adtrack_db::{HistoryRow, PoolConfig};
use chrono::{NaiveDate, Utc};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use uuid::Uuid;

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let app_config = AppConfig {
        database_url: "postgres://example".to_string(),
        env: Environment::Test,
        bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 3000),
        log_level: "info".to_string(),
        attachments_dir: PathBuf::from("./data/attachments"),
        db_max_connections: 42,
        db_min_connections: 7,
        db_acquire_timeout_secs: 9,
        scraper_request_timeout_secs: 90,
        scraper_user_agent: "ua".to_string(),
        scraper_settle_ms: 7000,
        scraper_inter_offer_delay_ms: 2000,
        scraper_region_label: "Selecionar país".to_string(),
        scraper_region_name: "Brasil".to_string(),
        browser_api: None,
        scrape_cron: "0 0 9 * * *".to_string(),
    };

    let pool_config = PoolConfig::from_app_config(&app_config);
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

#[test]
fn history_row_converts_to_day_count() {
    let day = NaiveDate::from_ymd_opt(2025, 7, 3).expect("valid date");
    let row = HistoryRow {
        id: 1,
        offer_id: Uuid::new_v4(),
        day,
        active_ads: 37,
        notes: None,
        tags: vec![],
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };

    assert_eq!(row.day_count(), DayCount::new(day, 37));
}
