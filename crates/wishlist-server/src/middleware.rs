use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use subtle::ConstantTimeEq;
use uuid::Uuid;

/// Header carrying the shared secret for the internal enrichment trigger.
pub const ENRICH_SECRET_HEADER: &str = "x-enrich-secret";

/// User id attached to requests while bearer auth is disabled.
pub const DEV_UID: &str = "dev";

/// Newtype wrapping a request ID string, stored as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// The authenticated caller's user id, stored as a request extension.
#[derive(Debug, Clone)]
pub struct AuthUser(pub String);

/// Bearer token settings used by middleware. Each token maps to one uid.
#[derive(Debug, Clone)]
pub struct AuthState {
    tokens: Arc<HashMap<String, String>>,
    pub enabled: bool,
}

impl AuthState {
    /// Builds auth config from `WISHLIST_API_TOKENS` (comma-separated
    /// `token:uid` pairs).
    ///
    /// In development, empty/missing tokens disable auth and every request
    /// acts as [`DEV_UID`]. In non-development envs, empty/missing tokens
    /// fail startup.
    pub fn from_env(is_development: bool) -> anyhow::Result<Self> {
        let raw = std::env::var("WISHLIST_API_TOKENS").unwrap_or_default();
        Self::from_raw(&raw, is_development)
    }

    pub fn from_raw(raw: &str, is_development: bool) -> anyhow::Result<Self> {
        let mut tokens = HashMap::new();
        for entry in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let Some((token, uid)) = entry.split_once(':') else {
                anyhow::bail!("WISHLIST_API_TOKENS entries must look like token:uid");
            };
            let (token, uid) = (token.trim(), uid.trim());
            if token.is_empty() || uid.is_empty() {
                anyhow::bail!("WISHLIST_API_TOKENS entries need both a token and a uid");
            }
            tokens.insert(token.to_owned(), uid.to_owned());
        }

        if tokens.is_empty() {
            if is_development {
                tracing::warn!(
                    "WISHLIST_API_TOKENS not set; bearer auth disabled in development environment"
                );
                return Ok(Self {
                    tokens: Arc::new(HashMap::new()),
                    enabled: false,
                });
            }

            anyhow::bail!(
                "WISHLIST_API_TOKENS is required outside development; provide comma-separated token:uid pairs"
            );
        }

        Ok(Self {
            tokens: Arc::new(tokens),
            enabled: true,
        })
    }

    fn uid_for(&self, token: &str) -> Option<&str> {
        self.tokens.get(token).map(String::as_str)
    }
}

/// Shared secret guarding the internal enrichment trigger.
///
/// With no secret configured every request is rejected.
#[derive(Debug, Clone)]
pub struct EnrichSecret {
    secret: Option<Arc<str>>,
}

impl EnrichSecret {
    #[must_use]
    pub fn new(secret: Option<String>) -> Self {
        Self {
            secret: secret.filter(|s| !s.is_empty()).map(Arc::from),
        }
    }

    fn allows(&self, provided: &str) -> bool {
        self.secret
            .as_deref()
            .is_some_and(|secret| bool::from(provided.as_bytes().ct_eq(secret.as_bytes())))
    }
}

#[derive(Debug, Serialize)]
struct MiddlewareErrorBody {
    error: MiddlewareError,
}

#[derive(Debug, Serialize)]
struct MiddlewareError {
    code: &'static str,
    message: &'static str,
}

fn middleware_error(status: StatusCode, code: &'static str, message: &'static str) -> Response {
    (
        status,
        Json(MiddlewareErrorBody {
            error: MiddlewareError { code, message },
        }),
    )
        .into_response()
}

/// Axum middleware that extracts or generates a request ID.
///
/// If the incoming request has an `x-request-id` header, that value is used.
/// Otherwise a new `UUIDv4` is generated. The ID is:
/// - Inserted into request extensions as [`RequestId`]
/// - Set on the response as the `x-request-id` header
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    req.extensions_mut().insert(RequestId(id.clone()));

    let mut res = next.run(req).await;

    if let Ok(val) = HeaderValue::from_str(&id) {
        res.headers_mut().insert("x-request-id", val);
    }

    res
}

/// Middleware resolving the bearer token to a uid and attaching [`AuthUser`].
pub async fn require_bearer_auth(
    State(auth): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Response {
    if !auth.enabled {
        req.extensions_mut().insert(AuthUser(DEV_UID.to_owned()));
        return next.run(req).await;
    }

    let uid = extract_bearer_token(req.headers().get(AUTHORIZATION))
        .and_then(|token| auth.uid_for(token))
        .map(ToOwned::to_owned);

    match uid {
        Some(uid) => {
            req.extensions_mut().insert(AuthUser(uid));
            next.run(req).await
        }
        None => middleware_error(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "missing or invalid bearer token",
        ),
    }
}

/// Middleware enforcing the `x-enrich-secret` shared secret.
pub async fn require_enrich_secret(
    State(secret): State<EnrichSecret>,
    req: Request,
    next: Next,
) -> Response {
    let allowed = extract_enrich_secret(req.headers()).is_some_and(|p| secret.allows(p));
    if allowed {
        return next.run(req).await;
    }

    tracing::warn!(path = %req.uri().path(), "rejected internal request with bad secret");
    middleware_error(
        StatusCode::FORBIDDEN,
        "forbidden",
        "missing or invalid enrich secret",
    )
}

fn extract_bearer_token(value: Option<&HeaderValue>) -> Option<&str> {
    value
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|s| !s.trim().is_empty())
}

fn extract_enrich_secret(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(ENRICH_SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
}
