//! Wishlist item handlers: create, refresh, preview, and the internal
//! enrichment trigger.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Extension, Json,
};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use wishlist_core::{EnrichStatus, ItemSource, ProductRecord, DEFAULT_CATEGORY};
use wishlist_db::NewWishlistItem;
use wishlist_enricher::{
    domain_from_url, extract_currency_loose, normalize_json_amount, parse_source_url,
};

use crate::dispatch::{run_enrichment, spawn_enrichment};
use crate::middleware::{AuthUser, RequestId};

use super::{map_db_error, map_json_rejection, ApiError, ApiResponse, AppState, ResponseMeta};

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(super) struct CreateItemRequest {
    pub url: String,
    pub title: Option<String>,
    pub shop: Option<String>,
    pub image_url: Option<String>,
    pub category: Option<String>,
    /// A JSON number or a loosely formatted string such as `"€ 19,99"`.
    pub price: Option<serde_json::Value>,
    pub source: Option<ItemSource>,
}

#[derive(Debug, Deserialize)]
pub(super) struct PreviewRequest {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct InternalEnrichRequest {
    pub uid: String,
    pub item_id: Uuid,
    pub url: String,
}

// ---------------------------------------------------------------------------
// Response bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub(super) struct CreateItemResponse {
    pub item_id: Uuid,
}

#[derive(Debug, Serialize)]
pub(super) struct RefreshItemResponse {
    pub item_id: Uuid,
    pub enrich_status: EnrichStatus,
}

// ---------------------------------------------------------------------------
// Validation helpers
// ---------------------------------------------------------------------------

fn validate_product_url(req_id: &str, raw: &str) -> Result<Url, ApiError> {
    parse_source_url(raw).map_err(|_| {
        ApiError::new(
            req_id,
            "validation_error",
            "url must be an absolute http(s) URL with a host",
        )
    })
}

fn parse_item_id(req_id: &str, raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| {
        ApiError::new(
            req_id,
            "validation_error",
            format!("item_id must be a UUID, got '{raw}'"),
        )
    })
}

/// Normalizes a client price. Strings also yield a currency guess.
fn parse_price(
    req_id: &str,
    value: Option<&serde_json::Value>,
) -> Result<(Option<f64>, Option<String>), ApiError> {
    let Some(value) = value.filter(|v| !v.is_null()) else {
        return Ok((None, None));
    };
    let Some(amount) = normalize_json_amount(value) else {
        return Err(ApiError::new(
            req_id,
            "validation_error",
            "price must be a non-negative number",
        ));
    };
    let currency = value
        .as_str()
        .and_then(extract_currency_loose)
        .map(str::to_string);
    Ok((Some(amount), currency))
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/items: save an item and enrich it in the background.
pub(super) async fn create_item(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<AuthUser>,
    body: Result<Json<CreateItemRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<CreateItemResponse>>), ApiError> {
    let rid = &req_id.0;
    let Json(body) = body.map_err(|e| map_json_rejection(rid, &e))?;

    let product_url = body.url.trim().to_owned();
    let url = validate_product_url(rid, &product_url)?;
    let (price, currency) = parse_price(rid, body.price.as_ref())?;
    let domain = domain_from_url(&url);

    let item = NewWishlistItem {
        title: non_blank(body.title.as_deref()).unwrap_or_else(|| domain.clone()),
        price,
        currency,
        shop: non_blank(body.shop.as_deref()).unwrap_or_else(|| domain.clone()),
        product_url: product_url.clone(),
        image_url: non_blank(body.image_url.as_deref()).unwrap_or_default(),
        domain,
        category: non_blank(body.category.as_deref())
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
        source: body.source.unwrap_or_default(),
    };

    let row = wishlist_db::insert_item(&state.pool, &user.0, &item)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    tracing::info!(
        uid = %user.0,
        item_id = %row.item_id,
        domain = %row.domain,
        source = item.source.as_str(),
        "item created; dispatching enrichment"
    );
    spawn_enrichment(
        state.pool.clone(),
        state.enricher.clone(),
        user.0,
        row.item_id,
        product_url,
    );

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: CreateItemResponse {
                item_id: row.item_id,
            },
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

/// POST /api/v1/items/{item_id}/refresh: re-run enrichment for an item.
pub(super) async fn refresh_item(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<AuthUser>,
    Path(item_id): Path<String>,
) -> Result<(StatusCode, Json<ApiResponse<RefreshItemResponse>>), ApiError> {
    let rid = &req_id.0;
    let item_id = parse_item_id(rid, &item_id)?;

    let item = wishlist_db::get_item(&state.pool, &user.0, item_id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    let product_url = item.product_url.trim().to_owned();
    if product_url.is_empty() {
        return Err(ApiError::new(
            rid,
            "bad_request",
            "item has no product url to refresh",
        ));
    }

    wishlist_db::mark_enrich_pending(&state.pool, &user.0, item_id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    tracing::info!(
        uid = %user.0,
        %item_id,
        previous_status = %item.enrich_status,
        "refresh requested; dispatching enrichment"
    );
    spawn_enrichment(
        state.pool.clone(),
        state.enricher.clone(),
        user.0,
        item_id,
        product_url,
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(ApiResponse {
            data: RefreshItemResponse {
                item_id,
                enrich_status: EnrichStatus::Pending,
            },
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

/// POST /api/v1/items/preview: enrich a URL without saving anything.
pub(super) async fn preview_item(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    body: Result<Json<PreviewRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<ProductRecord>>, ApiError> {
    let Json(body) = body.map_err(|e| map_json_rejection(&req_id.0, &e))?;
    let url = body.url.trim();
    validate_product_url(&req_id.0, url)?;

    let record = state.enricher.enrich(url).await;

    Ok(Json(ApiResponse {
        data: record,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// POST /api/v1/internal/enrich: synchronous enrichment for trusted callers.
pub(super) async fn internal_enrich(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    body: Result<Json<InternalEnrichRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<ProductRecord>>, ApiError> {
    let rid = &req_id.0;
    let Json(body) = body.map_err(|e| map_json_rejection(rid, &e))?;

    let uid = body.uid.trim();
    if uid.is_empty() {
        return Err(ApiError::new(rid, "validation_error", "uid is required"));
    }
    let url = body.url.trim();
    validate_product_url(rid, url)?;

    let record = run_enrichment(&state.pool, &state.enricher, uid, body.item_id, url)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    tracing::info!(
        uid,
        item_id = %body.item_id,
        status = %record.status,
        "internal enrichment stored"
    );

    Ok(Json(ApiResponse {
        data: record,
        meta: ResponseMeta::new(req_id.0),
    }))
}
