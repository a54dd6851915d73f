use super::*;
use crate::middleware::{AuthState, EnrichSecret};
use axum::body::{to_bytes, Body};
use axum::http::Request;
use serde_json::{json, Value};
use std::time::Duration;
use tower::ServiceExt;
use uuid::Uuid;
use wishlist_core::{EnrichStatus, ItemSource, WishlistItem};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "tok-alice";
const UID: &str = "alice";
const SECRET: &str = "s3cret";

const PRODUCT_PAGE: &str = r#"<html><head>
  <meta property="og:title" content="Ceramic Vase">
  <meta property="og:image" content="/img/vase.jpg">
  <meta property="product:price:amount" content="45.00">
  <meta property="product:price:currency" content="USD">
</head><body></body></html>"#;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn lazy_pool() -> PgPool {
    sqlx::postgres::PgPoolOptions::new()
        .acquire_timeout(Duration::from_millis(200))
        .connect_lazy("postgres://wishlist@127.0.0.1:1/unused")
        .expect("lazy pool")
}

fn test_app(pool: PgPool) -> Router {
    let auth = AuthState::from_raw(&format!("{TOKEN}:{UID}"), false).expect("auth");
    let enricher = Enricher::from_settings(5, "wishlist-test/0.1").expect("enricher");
    build_app(
        AppState {
            pool,
            enricher: Arc::new(enricher),
        },
        auth,
        EnrichSecret::new(Some(SECRET.to_string())),
    )
}

fn post_json(uri: &str) -> axum::http::request::Builder {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.expect("response");
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

fn authed(uri: &str, body: &Value) -> Request<Body> {
    post_json(uri)
        .header("authorization", format!("Bearer {TOKEN}"))
        .body(Body::from(body.to_string()))
        .expect("request")
}

fn internal(secret: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = post_json("/api/v1/internal/enrich");
    if let Some(secret) = secret {
        builder = builder.header("x-enrich-secret", secret);
    }
    builder.body(Body::from(body.to_string())).expect("request")
}

async fn mount_page(server: &MockServer, route: &str, template: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(template)
        .mount(server)
        .await;
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/html")
        .set_body_string(body.to_string())
}

async fn wait_for_enrichment(pool: &PgPool, uid: &str, item_id: Uuid) -> WishlistItem {
    for _ in 0..100 {
        let item = wishlist_db::get_item(pool, uid, item_id)
            .await
            .expect("get_item");
        if item.enrich_status != EnrichStatus::Pending {
            return item;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("enrichment for {item_id} never left pending");
}

fn item_id_from(json: &Value) -> Uuid {
    json["data"]["item_id"]
        .as_str()
        .and_then(|s| Uuid::parse_str(s).ok())
        .expect("item_id in response")
}

// ---------------------------------------------------------------------------
// Error mapping (no DB)
// ---------------------------------------------------------------------------

#[test]
fn api_error_codes_map_to_statuses() {
    let cases = [
        ("validation_error", StatusCode::BAD_REQUEST),
        ("bad_request", StatusCode::BAD_REQUEST),
        ("not_found", StatusCode::NOT_FOUND),
        ("forbidden", StatusCode::FORBIDDEN),
        ("internal_error", StatusCode::INTERNAL_SERVER_ERROR),
    ];
    for (code, expected) in cases {
        let response = ApiError::new("req-1", code, "msg").into_response();
        assert_eq!(response.status(), expected, "code {code}");
    }
}

#[test]
fn not_found_db_error_maps_to_not_found() {
    let err = map_db_error("req-1".to_string(), &wishlist_db::DbError::NotFound);
    assert_eq!(err.error.code, "not_found");
}

// ---------------------------------------------------------------------------
// Auth and validation (lazy pool, never connects)
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_item_without_token_is_unauthorized() {
    let body = json!({ "url": "https://shop.example/p/1" });
    let request = post_json("/api/v1/items")
        .body(Body::from(body.to_string()))
        .expect("request");

    let (status, json) = send(test_app(lazy_pool()), request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"]["code"], "unauthorized");
}

#[tokio::test]
async fn create_item_rejects_url_without_http_scheme() {
    let body = json!({ "url": "ftp://shop.example/p/1" });

    let (status, json) = send(test_app(lazy_pool()), authed("/api/v1/items", &body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "validation_error");
}

#[tokio::test]
async fn create_item_rejects_unparseable_price() {
    let body = json!({ "url": "https://shop.example/p/1", "price": "free" });

    let (status, json) = send(test_app(lazy_pool()), authed("/api/v1/items", &body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "validation_error");
}

#[tokio::test]
async fn create_item_without_url_uses_error_envelope() {
    let body = json!({ "title": "No link" });

    let (status, json) = send(test_app(lazy_pool()), authed("/api/v1/items", &body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "validation_error");
    assert!(json["meta"]["request_id"].is_string());
}

#[tokio::test]
async fn create_item_with_unknown_source_uses_error_envelope() {
    let body = json!({ "url": "https://shop.example/p/1", "source": "email" });

    let (status, json) = send(test_app(lazy_pool()), authed("/api/v1/items", &body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "validation_error");
}

#[tokio::test]
async fn preview_with_malformed_json_uses_error_envelope() {
    let request = post_json("/api/v1/items/preview")
        .header("authorization", format!("Bearer {TOKEN}"))
        .body(Body::from("{not json"))
        .expect("request");

    let (status, json) = send(test_app(lazy_pool()), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "validation_error");
}

#[tokio::test]
async fn internal_enrich_with_incomplete_body_uses_error_envelope() {
    let body = json!({ "uid": UID, "url": "https://shop.example/p/1" });

    let (status, json) = send(test_app(lazy_pool()), internal(Some(SECRET), &body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "validation_error");
}

#[tokio::test]
async fn refresh_rejects_non_uuid_item_id() {
    let (status, json) = send(
        test_app(lazy_pool()),
        authed("/api/v1/items/not-a-uuid/refresh", &json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "validation_error");
}

#[tokio::test]
async fn internal_enrich_without_secret_is_forbidden() {
    let body = json!({ "uid": UID, "item_id": Uuid::new_v4(), "url": "https://shop.example/p/1" });

    let (status, json) = send(test_app(lazy_pool()), internal(None, &body)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["error"]["code"], "forbidden");
}

#[tokio::test]
async fn internal_enrich_with_wrong_secret_is_forbidden() {
    let body = json!({ "uid": UID, "item_id": Uuid::new_v4(), "url": "https://shop.example/p/1" });

    let (status, _) = send(test_app(lazy_pool()), internal(Some("guess"), &body)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn internal_enrich_ignores_bearer_token() {
    let body = json!({ "uid": UID, "item_id": Uuid::new_v4(), "url": "https://shop.example/p/1" });
    let request = post_json("/api/v1/internal/enrich")
        .header("authorization", format!("Bearer {TOKEN}"))
        .body(Body::from(body.to_string()))
        .expect("request");

    let (status, _) = send(test_app(lazy_pool()), request).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn request_id_is_echoed_on_responses() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/items")
        .header("x-request-id", "req-abc")
        .body(Body::empty())
        .expect("request");

    let response = test_app(lazy_pool())
        .oneshot(request)
        .await
        .expect("response");
    assert_eq!(
        response
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok()),
        Some("req-abc")
    );
}

#[tokio::test]
async fn preview_returns_record_without_touching_database() {
    let server = MockServer::start().await;
    mount_page(&server, "/vase", html(PRODUCT_PAGE)).await;
    let url = format!("{}/vase", server.uri());

    let (status, json) = send(
        test_app(lazy_pool()),
        authed("/api/v1/items/preview", &json!({ "url": url })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "ok");
    assert_eq!(json["data"]["title"], "Ceramic Vase");
    assert_eq!(json["data"]["price"], 45.0);
    assert_eq!(json["data"]["currency"], "USD");
    assert_eq!(json["data"]["domain"], "127.0.0.1");
    assert_eq!(json["data"]["source_url"], url.as_str());
    assert!(json["meta"]["request_id"].is_string());
}

#[tokio::test]
async fn preview_reports_blocked_page_as_failed_record() {
    let server = MockServer::start().await;
    mount_page(&server, "/blocked", ResponseTemplate::new(403)).await;

    let (status, json) = send(
        test_app(lazy_pool()),
        authed(
            "/api/v1/items/preview",
            &json!({ "url": format!("{}/blocked", server.uri()) }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "failed");
    assert_eq!(json["data"]["error_reason"], "HTTP 403");
}

// ---------------------------------------------------------------------------
// Persistence flows (live database)
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn health_reports_ok_with_live_database(pool: sqlx::PgPool) {
    let request = Request::builder()
        .uri("/api/v1/health")
        .body(Body::empty())
        .expect("request");

    let (status, json) = send(test_app(pool), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "ok");
}

#[sqlx::test(migrations = "../../migrations")]
async fn created_item_is_enriched_in_background(pool: sqlx::PgPool) {
    let server = MockServer::start().await;
    mount_page(&server, "/vase", html(PRODUCT_PAGE)).await;
    let url = format!("{}/vase", server.uri());

    let (status, json) = send(
        test_app(pool.clone()),
        authed(
            "/api/v1/items",
            &json!({ "url": url, "source": "mobile_share" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let item_id = item_id_from(&json);

    let row = wait_for_enrichment(&pool, UID, item_id).await;
    assert_eq!(row.enrich_status, EnrichStatus::Ok);
    assert_eq!(row.title, "Ceramic Vase");
    assert_eq!(row.image_url, format!("{}/img/vase.jpg", server.uri()));
    assert_eq!(row.price, Some(45.0));
    assert_eq!(row.currency.as_deref(), Some("USD"));
    assert_eq!(row.shop, "127.0.0.1");
    assert_eq!(row.source, ItemSource::MobileShare);
    assert!(row.enriched_at.is_some());
}

#[sqlx::test(migrations = "../../migrations")]
async fn failed_enrichment_keeps_client_fields(pool: sqlx::PgPool) {
    let server = MockServer::start().await;
    mount_page(&server, "/gone", ResponseTemplate::new(404)).await;

    let (status, json) = send(
        test_app(pool.clone()),
        authed(
            "/api/v1/items",
            &json!({ "url": format!("{}/gone", server.uri()), "price": "€ 19,99" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let item_id = item_id_from(&json);

    let row = wait_for_enrichment(&pool, UID, item_id).await;
    assert_eq!(row.enrich_status, EnrichStatus::Failed);
    assert_eq!(row.enrich_error.as_deref(), Some("HTTP 404"));
    assert_eq!(row.title, "127.0.0.1");
    assert_eq!(row.shop, "127.0.0.1");
    assert_eq!(row.price, Some(19.99));
    assert_eq!(row.currency.as_deref(), Some("EUR"));
    assert_eq!(row.category, "other");
    assert_eq!(row.source, ItemSource::AppManual);
}

#[sqlx::test(migrations = "../../migrations")]
async fn refresh_of_missing_item_is_not_found(pool: sqlx::PgPool) {
    let uri = format!("/api/v1/items/{}/refresh", Uuid::new_v4());

    let (status, json) = send(test_app(pool), authed(&uri, &json!({}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["code"], "not_found");
}

#[sqlx::test(migrations = "../../migrations")]
async fn refresh_resets_failed_item_and_re_enriches(pool: sqlx::PgPool) {
    let server = MockServer::start().await;
    mount_page(&server, "/vase", html(PRODUCT_PAGE)).await;
    let url = format!("{}/vase", server.uri());

    let item = wishlist_db::NewWishlistItem {
        title: "127.0.0.1".to_string(),
        price: None,
        currency: None,
        shop: "127.0.0.1".to_string(),
        product_url: url.clone(),
        image_url: String::new(),
        domain: "127.0.0.1".to_string(),
        category: "other".to_string(),
        source: ItemSource::AppManual,
    };
    let row = wishlist_db::insert_item(&pool, UID, &item)
        .await
        .expect("insert_item");
    let failed = wishlist_core::ProductRecord::failed(url, "127.0.0.1", "HTTP 503");
    wishlist_db::apply_enrichment(&pool, UID, row.item_id, &failed)
        .await
        .expect("apply_enrichment");

    let uri = format!("/api/v1/items/{}/refresh", row.item_id);
    let (status, json) = send(test_app(pool.clone()), authed(&uri, &json!({}))).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(json["data"]["enrich_status"], "pending");

    let refreshed = wait_for_enrichment(&pool, UID, row.item_id).await;
    assert_eq!(refreshed.enrich_status, EnrichStatus::Ok);
    assert!(refreshed.enrich_error.is_none());
    assert_eq!(refreshed.title, "Ceramic Vase");
}

#[sqlx::test(migrations = "../../migrations")]
async fn refresh_is_scoped_to_token_owner(pool: sqlx::PgPool) {
    let item = wishlist_db::NewWishlistItem {
        title: "Lamp".to_string(),
        price: None,
        currency: None,
        shop: "shop.example".to_string(),
        product_url: "https://shop.example/lamp".to_string(),
        image_url: String::new(),
        domain: "shop.example".to_string(),
        category: "other".to_string(),
        source: ItemSource::Extension,
    };
    let row = wishlist_db::insert_item(&pool, "someone-else", &item)
        .await
        .expect("insert_item");

    let uri = format!("/api/v1/items/{}/refresh", row.item_id);
    let (status, _) = send(test_app(pool), authed(&uri, &json!({}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../migrations")]
async fn internal_enrich_persists_and_returns_record(pool: sqlx::PgPool) {
    let server = MockServer::start().await;
    mount_page(&server, "/vase", html(PRODUCT_PAGE)).await;
    let item_id = Uuid::new_v4();
    let body = json!({
        "uid": UID,
        "item_id": item_id,
        "url": format!("{}/vase", server.uri()),
    });

    let (status, json) = send(test_app(pool.clone()), internal(Some(SECRET), &body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "ok");
    assert_eq!(json["data"]["title"], "Ceramic Vase");

    let row = wishlist_db::get_item(&pool, UID, item_id)
        .await
        .expect("get_item");
    assert_eq!(row.enrich_status, EnrichStatus::Ok);
    assert_eq!(row.title, "Ceramic Vase");
}
