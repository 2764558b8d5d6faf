//! Axum handlers for the negotiation and product endpoints.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;

use crate::application::{NegotiationService, OfferRequest};
use crate::domain::foundation::{DomainError, ErrorKind, ProductId};
use crate::domain::negotiation::Language;
use crate::ports::ProductCatalog;

use super::dto::{
    CreateProductRequest, ErrorResponse, HistoryEntry, OfferBody, ProductResponse, SessionResponse,
    StartRequest,
};

/// Shared state for all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<NegotiationService>,
    pub catalog: Arc<dyn ProductCatalog>,
}

impl AppState {
    pub fn new(service: Arc<NegotiationService>, catalog: Arc<dyn ProductCatalog>) -> Self {
        Self { service, catalog }
    }
}

/// Maps a domain error kind onto its HTTP status.
fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::BadInput => StatusCode::BAD_REQUEST,
        ErrorKind::BadToken => StatusCode::UNAUTHORIZED,
        ErrorKind::NoSession => StatusCode::NOT_FOUND,
        ErrorKind::Busy | ErrorKind::OutOfOrder => StatusCode::CONFLICT,
        ErrorKind::SessionClosed => StatusCode::GONE,
        ErrorKind::ValidationFailed => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::Cooldown | ErrorKind::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        ErrorKind::DialogueFailed => StatusCode::BAD_GATEWAY,
        ErrorKind::Degraded => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: DomainError) -> Response {
    let status = status_for(err.kind);
    if status.is_server_error() {
        tracing::error!(kind = %err.kind, message = %err.message, "request failed");
    }
    // Internal details stay in the logs; the body is the opaque message.
    (
        status,
        Json(ErrorResponse::new(err.kind.code(), err.message)),
    )
        .into_response()
}

/// Caller identity for rate limiting: the first forwarded address, or a
/// fixed tag when the service fronts no proxy.
fn buyer_ref(headers: &HeaderMap, fallback: Option<&str>) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| fallback.map(str::to_string))
        .unwrap_or_else(|| "anonymous".to_string())
}

fn session_token(headers: &HeaderMap) -> Result<String, DomainError> {
    headers
        .get("X-Session-Token")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .ok_or_else(DomainError::bad_token)
}

// ── Negotiation endpoints ───────────────────────────────────────────

/// POST /negotiate/start
pub async fn start(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<StartRequest>,
) -> Response {
    let language = Language::parse_lossy(body.language.as_deref().unwrap_or(""));
    let buyer = buyer_ref(&headers, body.buyer_name.as_deref());

    match state.service.start(&body.product_id, &buyer, language).await {
        Ok(reply) => (StatusCode::OK, Json(SessionResponse::from(reply))).into_response(),
        Err(err) => error_response(err),
    }
}

/// POST /negotiate/{session_id}/offer
pub async fn offer(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<OfferBody>,
) -> Response {
    let token = match session_token(&headers) {
        Ok(token) => token,
        Err(err) => return error_response(err),
    };

    let request = OfferRequest {
        session_id,
        token,
        price: body.price,
        message: body.message.unwrap_or_default(),
        language: body.language.as_deref().map(Language::parse_lossy),
        round: body.round,
    };

    match state.service.offer(request).await {
        Ok(reply) => (StatusCode::OK, Json(SessionResponse::from(reply))).into_response(),
        Err(err) => error_response(err),
    }
}

/// GET /negotiate/{session_id}/status
pub async fn status(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let token = match session_token(&headers) {
        Ok(token) => token,
        Err(err) => return error_response(err),
    };

    match state.service.status(&session_id, &token).await {
        Ok(reply) => (StatusCode::OK, Json(SessionResponse::from(reply))).into_response(),
        Err(err) => error_response(err),
    }
}

/// GET /negotiate/{session_id}/history
pub async fn history(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let token = match session_token(&headers) {
        Ok(token) => token,
        Err(err) => return error_response(err),
    };

    match state.service.history(&session_id, &token).await {
        Ok(events) => Json(
            events
                .into_iter()
                .map(HistoryEntry::from)
                .collect::<Vec<_>>(),
        )
        .into_response(),
        Err(err) => error_response(err),
    }
}

/// GET /health
pub async fn health() -> Response {
    Json(serde_json::json!({
        "status": "ok",
        "engine": "mol-bhav",
        "version": env!("CARGO_PKG_VERSION"),
    }))
    .into_response()
}

// ── Product admin endpoints ─────────────────────────────────────────

/// POST /products
pub async fn create_product(
    State(state): State<AppState>,
    Json(body): Json<CreateProductRequest>,
) -> Response {
    let product = match body.into_product() {
        Ok(product) => product,
        Err(err) => return error_response(err),
    };
    match state.catalog.upsert(&product).await {
        Ok(()) => (
            StatusCode::CREATED,
            Json(ProductResponse::from(product)),
        )
            .into_response(),
        Err(err) => error_response(err),
    }
}

/// GET /products/{product_id}
pub async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> Response {
    let id = match ProductId::new(product_id) {
        Ok(id) => id,
        Err(err) => return error_response(err.into()),
    };
    match state.catalog.get(&id).await {
        Ok(Some(product)) => Json(ProductResponse::from(product)).into_response(),
        Ok(None) => error_response(DomainError::new(ErrorKind::NoSession, "Product not found")),
        Err(err) => error_response(err),
    }
}

/// Pagination query for product listing.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
}

fn default_limit() -> u32 {
    50
}

/// GET /products
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Response {
    match state.catalog.list(query.limit.min(200), query.offset).await {
        Ok(products) => Json(
            products
                .into_iter()
                .map(ProductResponse::from)
                .collect::<Vec<_>>(),
        )
        .into_response(),
        Err(err) => error_response(err),
    }
}
