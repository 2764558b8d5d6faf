//! HTTP middleware: request ids and the admin key gate.

use axum::{
    extract::{Request, State},
    http::{HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use subtle::ConstantTimeEq;
use tracing::Instrument;
use uuid::Uuid;

use super::dto::ErrorResponse;

/// Request id propagated into logs and echoed back to the caller.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Reads or mints `X-Request-ID`, stores it in request extensions, and
/// echoes it on the response.
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let rid = request
        .headers()
        .get("X-Request-ID")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().simple().to_string());

    request.extensions_mut().insert(RequestId(rid.clone()));

    let span = tracing::info_span!("request", request_id = %rid);
    let mut response = next.run(request).instrument(span).await;
    if let Ok(value) = HeaderValue::from_str(&rid) {
        response.headers_mut().insert("X-Request-ID", value);
    }
    response
}

/// Admin key state for the product routes.
#[derive(Debug, Clone, Default)]
pub struct AdminKey(pub Option<String>);

impl AdminKey {
    /// Constant-time check of a presented key. An unset key allows
    /// access (development mode); production config validation refuses
    /// to boot without one.
    pub fn verify(&self, presented: Option<&str>) -> bool {
        match (&self.0, presented) {
            (None, _) => true,
            (Some(expected), Some(presented)) => {
                let a = expected.as_bytes();
                let b = presented.as_bytes();
                if a.len() != b.len() {
                    let _ = a.ct_eq(a);
                    return false;
                }
                a.ct_eq(b).into()
            }
            (Some(_), None) => false,
        }
    }
}

/// Rejects product-admin requests without a valid `X-API-Key`.
pub async fn require_admin_key(
    State(key): State<AdminKey>,
    request: Request,
    next: Next,
) -> Response {
    let presented = request
        .headers()
        .get("X-API-Key")
        .and_then(|v| v.to_str().ok());

    if !key.verify(presented) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse::new("bad_token", "Invalid API key")),
        )
            .into_response();
    }
    next.run(request).await
}
