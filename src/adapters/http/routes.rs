//! Route composition for the negotiation API.

use axum::http::HeaderValue;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use super::handlers::{self, AppState};
use super::middleware::{request_id_middleware, require_admin_key, AdminKey};

/// Builds the full API router.
///
/// Product routes sit behind the admin key; everything runs through the
/// request-id middleware and the CORS layer.
pub fn router(state: AppState, admin_key: AdminKey, cors_origins: Vec<String>) -> Router {
    let negotiate = Router::new()
        .route("/negotiate/start", post(handlers::start))
        .route("/negotiate/:session_id/offer", post(handlers::offer))
        .route("/negotiate/:session_id/status", get(handlers::status))
        .route("/negotiate/:session_id/history", get(handlers::history));

    let products = Router::new()
        .route(
            "/products",
            post(handlers::create_product).get(handlers::list_products),
        )
        .route("/products/:product_id", get(handlers::get_product))
        .layer(middleware::from_fn_with_state(admin_key, require_admin_key));

    Router::new()
        .merge(negotiate)
        .merge(products)
        .route("/health", get(handlers::health))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(cors_layer(cors_origins))
        .with_state(state)
}

/// CORS from the configured origin list; an empty list stays permissive
/// for development.
fn cors_layer(origins: Vec<String>) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }
    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| o.parse::<HeaderValue>().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(parsed))
        .allow_methods(Any)
        .allow_headers(Any)
}
