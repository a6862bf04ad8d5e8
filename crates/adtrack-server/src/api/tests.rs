use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::Request;
use chrono::Duration;
use tower::ServiceExt;

use adtrack_core::NewOffer;
use adtrack_scraper::{PageRenderer, RenderedPage, ResultCountExtractor, ScraperError};

use super::*;

/// Serves the same ad-library markup for every URL.
struct FixedPage(&'static str);

#[async_trait::async_trait]
impl PageRenderer for FixedPage {
    async fn render(&self, url: &str) -> Result<RenderedPage, ScraperError> {
        Ok(RenderedPage::new(url, self.0.to_string()))
    }
}

fn test_app(pool: PgPool, auth: AuthState) -> (Router, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let state = AppState {
        pool,
        counter: AdCounter::new(
            Arc::new(FixedPage(r#"<div role="heading">~37 resultados</div>"#)),
            Arc::new(ResultCountExtractor),
        ),
        attachments: AttachmentStore::new(dir.path()),
    };
    (build_app(state, auth, default_rate_limit_state()), dir)
}

fn open_auth() -> AuthState {
    AuthState::from_keys("", true).expect("auth")
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    let json = if body.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body).expect("json parse")
    };
    (status, json)
}

fn get_req(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

fn json_req(method: Method, uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

async fn seed_offer(pool: &PgPool, name: &str, category: Option<&str>) -> OfferRow {
    adtrack_db::create_offer(
        pool,
        &NewOffer {
            name: name.to_string(),
            tags: vec!["emagrecimento".to_string()],
            languages: vec!["pt".to_string()],
            source_url: None,
            site_url: None,
            checkout_url: None,
            category: category.map(str::to_string),
        }
        .validated()
        .expect("valid offer"),
        today(),
    )
    .await
    .expect("create offer")
}

#[test]
fn api_error_upstream_error_maps_to_bad_gateway() {
    let response = ApiError::new("req-1", "upstream_error", "browser api down").into_response();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[test]
fn api_error_validation_error_maps_to_bad_request() {
    let response = ApiError::new("req-1", "validation_error", "invalid input").into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[test]
fn validate_url_accepts_only_http_schemes() {
    assert!(validate_url("req", "source_url", "https://www.facebook.com/ads/library/?q=x").is_ok());
    assert!(validate_url("req", "source_url", "ftp://example.com/file").is_err());
    assert!(validate_url("req", "source_url", "not a url").is_err());
}

#[sqlx::test(migrations = "../../migrations")]
async fn health_reports_database_ok(pool: PgPool) {
    let (app, _dir) = test_app(pool, open_auth());
    let (status, json) = send(&app, get_req("/api/v1/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "ok");
    assert!(json["meta"]["request_id"].is_string());
}

#[sqlx::test(migrations = "../../migrations")]
async fn protected_routes_require_bearer_token_when_enabled(pool: PgPool) {
    let (app, _dir) = test_app(pool, AuthState::from_keys("s3cret", false).expect("auth"));

    let (status, json) = send(&app, get_req("/api/v1/offers")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"]["code"], "unauthorized");

    let authorized = Request::builder()
        .uri("/api/v1/offers")
        .header(header::AUTHORIZATION, "Bearer s3cret")
        .body(Body::empty())
        .expect("request");
    let (status, _) = send(&app, authorized).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, get_req("/api/v1/health")).await;
    assert_eq!(status, StatusCode::OK);
}

#[sqlx::test(migrations = "../../migrations")]
async fn create_offer_starts_with_zero_counts(pool: PgPool) {
    let (app, _dir) = test_app(pool, open_auth());
    let body = serde_json::json!({
        "name": "  Detox Pro  ",
        "tags": ["saude", "detox"],
        "languages": ["pt"],
        "site_url": "https://detox.example.com"
    });

    let (status, json) = send(&app, json_req(Method::POST, "/api/v1/offers", &body)).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["data"]["name"], "Detox Pro");
    assert_eq!(json["data"]["active_today"], 0);
    assert_eq!(json["data"]["active_yesterday"], 0);
    assert_eq!(json["data"]["variation"], "0%");
    assert_eq!(json["data"]["enabled"], true);

    let (status, json) = send(&app, get_req("/api/v1/offers")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"].as_array().expect("array").len(), 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn create_offer_rejects_duplicates_and_bad_input(pool: PgPool) {
    seed_offer(&pool, "Taken", None).await;
    let (app, _dir) = test_app(pool, open_auth());

    let duplicate = serde_json::json!({ "name": "Taken", "tags": ["a"], "languages": ["pt"] });
    let (status, json) = send(&app, json_req(Method::POST, "/api/v1/offers", &duplicate)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"]["code"], "conflict");

    let no_tags = serde_json::json!({ "name": "Fresh", "tags": [], "languages": ["pt"] });
    let (status, _) = send(&app, json_req(Method::POST, "/api/v1/offers", &no_tags)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let bad_url = serde_json::json!({
        "name": "Fresh",
        "tags": ["a"],
        "languages": ["pt"],
        "source_url": "javascript:alert(1)"
    });
    let (status, json) = send(&app, json_req(Method::POST, "/api/v1/offers", &bad_url)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "validation_error");
}

#[sqlx::test(migrations = "../../migrations")]
async fn patch_offer_distinguishes_null_from_missing(pool: PgPool) {
    let offer = seed_offer(&pool, "Patchable", Some("saude")).await;
    let (app, _dir) = test_app(pool, open_auth());
    let uri = format!("/api/v1/offers/{}", offer.id);

    let set = serde_json::json!({ "site_url": "https://site.example.com" });
    let (status, json) = send(&app, json_req(Method::PATCH, &uri, &set)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["site_url"], "https://site.example.com");
    assert_eq!(json["data"]["category"], "saude");

    let clear = serde_json::json!({ "site_url": null, "enabled": false });
    let (status, json) = send(&app, json_req(Method::PATCH, &uri, &clear)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["data"]["site_url"].is_null());
    assert_eq!(json["data"]["category"], "saude");
    assert_eq!(json["data"]["enabled"], false);
}

#[sqlx::test(migrations = "../../migrations")]
async fn unknown_offer_returns_not_found(pool: PgPool) {
    let (app, _dir) = test_app(pool, open_auth());
    let uri = format!("/api/v1/offers/{}", Uuid::new_v4());

    let (status, json) = send(&app, get_req(&uri)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["code"], "not_found");

    let delete = Request::builder()
        .method(Method::DELETE)
        .uri(&uri)
        .body(Body::empty())
        .expect("request");
    let (status, _) = send(&app, delete).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../migrations")]
async fn history_lookup_reads_missing_rows_as_zero(pool: PgPool) {
    let offer = seed_offer(&pool, "Ledger", None).await;
    let day = today();
    adtrack_db::upsert_history_day(&pool, offer.id, day, 14)
        .await
        .expect("upsert");
    let (app, _dir) = test_app(pool, open_auth());

    let iso = format!("/api/v1/history?id={}&day={}", offer.id, day.format("%Y-%m-%d"));
    let (status, json) = send(&app, get_req(&iso)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, serde_json::json!({ "ativos": 14 }));

    let locale = format!(
        "/api/v1/history?id={}&day={}",
        offer.id,
        (day - Duration::days(1)).format("%d/%m/%Y")
    );
    let (status, json) = send(&app, get_req(&locale)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["ativos"], 0);
    assert!(json.get("data").is_none());

    let (status, json) = send(&app, get_req("/api/v1/history?day=2025-01-01")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "bad_request");
}

#[sqlx::test(migrations = "../../migrations")]
async fn annotations_apply_to_every_history_row(pool: PgPool) {
    let offer = seed_offer(&pool, "Annotated", None).await;
    let day = today();
    for (offset, count) in [(2, 5), (1, 8), (0, 13)] {
        adtrack_db::upsert_history_day(&pool, offer.id, day - Duration::days(offset), count)
            .await
            .expect("upsert");
    }
    let (app, _dir) = test_app(pool, open_auth());

    let body = serde_json::json!({ "notes": "criativo novo", "tags": ["video"] });
    let uri = format!("/api/v1/offers/{}/history/annotations", offer.id);
    let (status, json) = send(&app, json_req(Method::PUT, &uri, &body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["updated"], 3);

    let uri = format!("/api/v1/offers/{}/history", offer.id);
    let (_, json) = send(&app, get_req(&uri)).await;
    let rows = json["data"].as_array().expect("array");
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|r| r["notes"] == "criativo novo"));
    assert_eq!(rows[2]["active_ads"], 13);
}

#[sqlx::test(migrations = "../../migrations")]
async fn scrape_with_offer_id_reconciles_the_count(pool: PgPool) {
    let offer = seed_offer(&pool, "Scraped", None).await;
    adtrack_db::upsert_history_day(&pool, offer.id, today() - Duration::days(1), 20)
        .await
        .expect("upsert");
    let (app, _dir) = test_app(pool.clone(), open_auth());

    let body = serde_json::json!({
        "id": offer.id,
        "sourceUrl": "https://www.facebook.com/ads/library/?q=scraped"
    });
    let (status, json) = send(&app, json_req(Method::POST, "/api/v1/scrape", &body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, serde_json::json!({ "ativosHoje": 37 }));

    let stored = adtrack_db::get_offer(&pool, offer.id)
        .await
        .expect("get")
        .expect("offer exists");
    assert_eq!(stored.active_today, 37);
    assert_eq!(stored.active_yesterday, 20);
    assert_eq!(stored.variation, "85.0%");
}

#[sqlx::test(migrations = "../../migrations")]
async fn scrape_without_offer_only_reports(pool: PgPool) {
    let (app, _dir) = test_app(pool, open_auth());

    let body = serde_json::json!({ "sourceUrl": "https://lib.example/ads" });
    let (status, json) = send(&app, json_req(Method::POST, "/api/v1/scrape", &body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["ativosHoje"], 37);
    assert!(json.get("meta").is_none());

    let body = serde_json::json!({ "id": Uuid::new_v4(), "sourceUrl": "https://lib.example/ads" });
    let (status, json) = send(&app, json_req(Method::POST, "/api/v1/scrape", &body)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["code"], "not_found");
}

#[sqlx::test(migrations = "../../migrations")]
async fn insights_fill_gaps_and_list_related_offers(pool: PgPool) {
    let offer = seed_offer(&pool, "Insightful", Some("renda-extra")).await;
    seed_offer(&pool, "Sibling", Some("renda-extra")).await;
    seed_offer(&pool, "Stranger", Some("outra")).await;
    let day = today();
    adtrack_db::upsert_history_day(&pool, offer.id, day - Duration::days(3), 10)
        .await
        .expect("upsert");
    adtrack_db::upsert_history_day(&pool, offer.id, day - Duration::days(1), 30)
        .await
        .expect("upsert");
    let (app, _dir) = test_app(pool, open_auth());

    let uri = format!("/api/v1/offers/{}/insights?days=5", offer.id);
    let (status, json) = send(&app, get_req(&uri)).await;
    assert_eq!(status, StatusCode::OK);

    let data = &json["data"];
    let trailing = data["trailing_series"].as_array().expect("array");
    assert_eq!(trailing.len(), 5);
    let counts: Vec<i64> = trailing
        .iter()
        .map(|d| d["count"].as_i64().expect("count"))
        .collect();
    assert_eq!(counts, vec![0, 10, 0, 30, 0]);
    assert_eq!(data["peak"]["count"], 30);
    assert_eq!(data["cumulative_variation"], "200.0");
    assert_eq!(data["related"].as_array().expect("array").len(), 1);
    assert_eq!(data["related"][0]["name"], "Sibling");

    let uri = format!("/api/v1/offers/{}/insights?days=0", offer.id);
    let (status, _) = send(&app, get_req(&uri)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../migrations")]
async fn calendar_marks_peak_days(pool: PgPool) {
    let offer = seed_offer(&pool, "Calendar", None).await;
    let day = today();
    for (offset, count) in [(2, 4), (1, 0), (0, 9)] {
        adtrack_db::upsert_history_day(&pool, offer.id, day - Duration::days(offset), count)
            .await
            .expect("upsert");
    }
    let (app, _dir) = test_app(pool, open_auth());

    let uri = format!("/api/v1/offers/{}/calendar", offer.id);
    let (status, json) = send(&app, get_req(&uri)).await;
    assert_eq!(status, StatusCode::OK);

    let cells = json["data"]["cells"].as_array().expect("array");
    let heats: Vec<&str> = cells
        .iter()
        .map(|c| c["heat"].as_str().expect("heat"))
        .collect();
    assert_eq!(heats, vec!["active", "empty", "peak"]);
    assert_eq!(
        json["data"]["end"],
        serde_json::json!(day.format("%Y-%m-%d").to_string())
    );
}

#[sqlx::test(migrations = "../../migrations")]
async fn experiments_report_pending_and_best_arms(pool: PgPool) {
    let low = seed_offer(&pool, "Arm A low", None).await;
    let high = seed_offer(&pool, "Arm A high", None).await;
    let pending = seed_offer(&pool, "Arm B new", None).await;
    let day = today();
    for offset in 0..15 {
        let d = day - Duration::days(offset);
        adtrack_db::upsert_history_day(&pool, low.id, d, 1)
            .await
            .expect("upsert");
        adtrack_db::upsert_history_day(&pool, high.id, d, 3)
            .await
            .expect("upsert");
    }
    adtrack_db::upsert_history_day(&pool, pending.id, day, 50)
        .await
        .expect("upsert");
    let (app, _dir) = test_app(pool, open_auth());

    for (id, arm) in [(low.id, "A"), (high.id, "a"), (pending.id, "B")] {
        let uri = format!("/api/v1/offers/{id}/experiment");
        let body = serde_json::json!({ "experiment": arm });
        let (status, _) = send(&app, json_req(Method::PUT, &uri, &body)).await;
        assert_eq!(status, StatusCode::OK);
    }

    let uri = format!("/api/v1/offers/{}/experiment", low.id);
    let body = serde_json::json!({ "experiment": "C" });
    let (status, _) = send(&app, json_req(Method::PUT, &uri, &body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = send(&app, get_req("/api/v1/experiments")).await;
    assert_eq!(status, StatusCode::OK);

    let data = &json["data"];
    assert_eq!(data["offers"].as_array().expect("array").len(), 3);
    let best = data["best_per_arm"].as_array().expect("array");
    assert_eq!(best.len(), 1);
    assert_eq!(best[0]["name"], "Arm A high");
    assert_eq!(best[0]["total"], 45);
    assert_eq!(data["overall_best"]["name"], "Arm A high");

    let pending_row = data["offers"]
        .as_array()
        .expect("array")
        .iter()
        .find(|o| o["name"] == "Arm B new")
        .expect("pending offer listed");
    assert_eq!(pending_row["outcome"]["status"], "pending");
    assert_eq!(pending_row["outcome"]["days_recorded"], 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn summary_totals_denormalized_counts(pool: PgPool) {
    let first = seed_offer(&pool, "One", None).await;
    let second = seed_offer(&pool, "Two", None).await;
    let day = today();
    adtrack_db::record_observation(&pool, first.id, Some(12), day)
        .await
        .expect("record");
    adtrack_db::record_observation(&pool, second.id, Some(8), day)
        .await
        .expect("record");
    let (app, _dir) = test_app(pool, open_auth());

    let (status, json) = send(&app, get_req("/api/v1/analytics/summary")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["offers"], 2);
    assert_eq!(json["data"]["total_active_today"], 20);
    assert!(json["data"]["average_seven_day_growth"].is_null());
}

#[sqlx::test(migrations = "../../migrations")]
async fn attachment_upload_stores_file_under_offer(pool: PgPool) {
    let offer = seed_offer(&pool, "With files", None).await;
    let (app, dir) = test_app(pool, open_auth());

    let uri = format!("/api/v1/offers/{}/attachments/criativo.png", offer.id);
    let request = Request::builder()
        .method(Method::PUT)
        .uri(&uri)
        .body(Body::from(vec![0x89_u8, b'P', b'N', b'G']))
        .expect("request");
    let (status, json) = send(&app, request).await;

    assert_eq!(status, StatusCode::CREATED);
    let expected = format!("{}/criativo.png", offer.id);
    assert_eq!(json["data"]["path"], expected.as_str());
    let stored = std::fs::read(dir.path().join(&expected)).expect("file written");
    assert_eq!(stored, vec![0x89_u8, b'P', b'N', b'G']);
}
