//! HTTP surface tests via tower's oneshot, over in-memory adapters.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

use mol_bhav::adapters::http::{router, AdminKey, AppState};
use mol_bhav::adapters::llm::TemplateDialogueModel;
use mol_bhav::adapters::memory::{
    InMemoryCouponCatalog, InMemoryDurableStore, InMemoryHotStore, InMemoryProductCatalog,
};
use mol_bhav::application::{
    CouponService, DialogueGenerator, NegotiationConfig, NegotiationService,
};
use mol_bhav::domain::catalog::Product;
use mol_bhav::domain::foundation::ProductId;
use mol_bhav::domain::negotiation::SessionParams;
use mol_bhav::domain::quote::QuoteSigner;

const ADMIN_KEY: &str = "admin-test-key";

async fn app() -> Router {
    let catalog = InMemoryProductCatalog::new();
    catalog
        .seed(vec![Product::new(
            ProductId::new("saree-1").unwrap(),
            "Banarasi saree",
            "apparel",
            12999,
            9000,
            0.05,
            0.30,
            HashMap::new(),
        )
        .unwrap()])
        .await;
    let catalog = Arc::new(catalog);

    let service = Arc::new(NegotiationService::new(
        Arc::new(InMemoryHotStore::new()),
        Arc::new(InMemoryDurableStore::new()),
        catalog.clone(),
        DialogueGenerator::new(Arc::new(TemplateDialogueModel::new()), true),
        CouponService::new(Arc::new(InMemoryCouponCatalog::new())),
        QuoteSigner::new("test-key"),
        NegotiationConfig {
            params: SessionParams::default(),
            epsilon_pct: 0.01,
            cooldown: Duration::ZERO,
            lock_lease: Duration::from_secs(5),
            start_rate_limit: 30,
            durable_retries: 3,
        },
    ));

    router(
        AppState::new(service, catalog),
        AdminKey(Some(ADMIN_KEY.to_string())),
        vec![],
    )
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), 1 << 20)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn start_session(app: &Router) -> serde_json::Value {
    let response = app
        .clone()
        .oneshot(post_json(
            "/negotiate/start",
            serde_json::json!({"product_id": "saree-1", "buyer_name": "Asha"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    json_body(response).await
}

#[tokio::test]
async fn health_answers() {
    let app = app().await;
    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["engine"], "mol-bhav");
}

#[tokio::test]
async fn start_returns_the_session_response_shape() {
    let app = app().await;
    let body = start_session(&app).await;

    assert_eq!(body["state"], "proposing");
    assert_eq!(body["tactic"], "opening_anchor");
    assert_eq!(body["current_price"], 12999);
    assert_eq!(body["anchor_price"], 12999);
    assert_eq!(body["round"], 0);
    assert_eq!(body["max_rounds"], 15);
    assert_eq!(body["quote_ttl_seconds"], 60);
    assert!(body["agreed_price"].is_null());
    assert_eq!(body["session_id"].as_str().unwrap().len(), 32);
    assert_eq!(body["session_token"].as_str().unwrap().len(), 64);
    assert!(!body["message"].as_str().unwrap().is_empty());
    // The floor never appears anywhere in the response.
    assert!(!serde_json::to_string(&body).unwrap().contains("9450"));
}

#[tokio::test]
async fn offer_round_trip_through_http() {
    let app = app().await;
    let start = start_session(&app).await;
    let session_id = start["session_id"].as_str().unwrap();
    let token = start["session_token"].as_str().unwrap();

    let mut request = post_json(
        &format!("/negotiate/{}/offer", session_id),
        serde_json::json!({"price": 12999, "message": "done deal"}),
    );
    request
        .headers_mut()
        .insert("X-Session-Token", token.parse().unwrap());

    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["state"], "agreed");
    assert_eq!(body["agreed_price"], 12999);
    assert_eq!(body["round"], 1);
    assert!(body["metadata"]["quote"]["signature"].is_string());
}

#[tokio::test]
async fn offer_without_token_is_unauthorized() {
    let app = app().await;
    let start = start_session(&app).await;
    let session_id = start["session_id"].as_str().unwrap();

    let request = post_json(
        &format!("/negotiate/{}/offer", session_id),
        serde_json::json!({"price": 9999}),
    );
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["error"], "bad_token");
}

#[tokio::test]
async fn wrong_token_and_unknown_session_look_identical() {
    let app = app().await;
    let start = start_session(&app).await;
    let session_id = start["session_id"].as_str().unwrap().to_string();

    let mut known = post_json(
        &format!("/negotiate/{}/offer", session_id),
        serde_json::json!({"price": 9999}),
    );
    known
        .headers_mut()
        .insert("X-Session-Token", "0".repeat(64).parse().unwrap());
    let known = app.clone().oneshot(known).await.unwrap();

    let mut unknown = post_json(
        "/negotiate/00000000000000000000000000000000/offer",
        serde_json::json!({"price": 9999}),
    );
    unknown
        .headers_mut()
        .insert("X-Session-Token", "0".repeat(64).parse().unwrap());
    let unknown = app.clone().oneshot(unknown).await.unwrap();

    assert_eq!(known.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(known).await, json_body(unknown).await);
}

#[tokio::test]
async fn malformed_session_id_is_bad_input() {
    let app = app().await;
    let mut request = post_json(
        "/negotiate/not-a-session-id/offer",
        serde_json::json!({"price": 9999}),
    );
    request
        .headers_mut()
        .insert("X-Session-Token", "0".repeat(64).parse().unwrap());
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "bad_input");
}

#[tokio::test]
async fn non_positive_price_is_bad_input() {
    let app = app().await;
    let start = start_session(&app).await;
    let session_id = start["session_id"].as_str().unwrap();
    let token = start["session_token"].as_str().unwrap();

    let mut request = post_json(
        &format!("/negotiate/{}/offer", session_id),
        serde_json::json!({"price": -10}),
    );
    request
        .headers_mut()
        .insert("X-Session-Token", token.parse().unwrap());
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn status_is_read_only() {
    let app = app().await;
    let start = start_session(&app).await;
    let session_id = start["session_id"].as_str().unwrap();
    let token = start["session_token"].as_str().unwrap();

    for _ in 0..2 {
        let request = Request::get(format!("/negotiate/{}/status", session_id))
            .header("X-Session-Token", token)
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["round"], 0);
        assert_eq!(body["state"], "proposing");
    }
}

#[tokio::test]
async fn history_lists_the_audit_trail() {
    let app = app().await;
    let start = start_session(&app).await;
    let session_id = start["session_id"].as_str().unwrap();
    let token = start["session_token"].as_str().unwrap();

    let mut request = post_json(
        &format!("/negotiate/{}/offer", session_id),
        serde_json::json!({"price": 9600}),
    );
    request
        .headers_mut()
        .insert("X-Session-Token", token.parse().unwrap());
    app.clone().oneshot(request).await.unwrap();

    let request = Request::get(format!("/negotiate/{}/history", session_id))
        .header("X-Session-Token", token)
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let entries = body.as_array().unwrap();
    // Opening seller offer plus one full round.
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0]["actor"], "seller");
    assert_eq!(entries[0]["round"], 0);
    // Detector internals never reach the wire.
    assert!(entries.iter().all(|e| e.get("bot_score").is_none()));
}

#[tokio::test]
async fn request_id_is_echoed() {
    let app = app().await;
    let response = app
        .oneshot(
            Request::get("/health")
                .header("X-Request-ID", "trace-42")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.headers()["X-Request-ID"], "trace-42");
}

// ── Admin surface ───────────────────────────────────────────────────

#[tokio::test]
async fn product_routes_require_the_admin_key() {
    let app = app().await;

    let response = app
        .clone()
        .oneshot(Request::get("/products").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(
            Request::get("/products")
                .header("X-API-Key", "wrong-key-entirely")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(
            Request::get("/products")
                .header("X-API-Key", ADMIN_KEY)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn created_product_is_immediately_negotiable() {
    let app = app().await;

    let mut request = post_json(
        "/products",
        serde_json::json!({
            "id": "diya-7",
            "name": "Brass diya",
            "category": "decor",
            "anchor_price": 800,
            "cost_price": 500,
            "min_margin": 0.1,
            "target_margin": 0.3
        }),
    );
    request
        .headers_mut()
        .insert("X-API-Key", ADMIN_KEY.parse().unwrap());
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .clone()
        .oneshot(post_json(
            "/negotiate/start",
            serde_json::json!({"product_id": "diya-7"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["anchor_price"], 800);
}

#[tokio::test]
async fn invalid_product_payload_is_rejected() {
    let app = app().await;
    let mut request = post_json(
        "/products",
        serde_json::json!({
            "id": "bad product id!",
            "name": "X",
            "anchor_price": 100,
            "cost_price": 50,
            "min_margin": 0.1,
            "target_margin": 0.2
        }),
    );
    request
        .headers_mut()
        .insert("X-API-Key", ADMIN_KEY.parse().unwrap());
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn start_for_missing_product_is_opaque() {
    let app = app().await;
    let response = app
        .oneshot(post_json(
            "/negotiate/start",
            serde_json::json!({"product_id": "no-such-product"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(response).await;
    assert_eq!(body["error"], "internal");
    // The body never says which product exists or not.
    assert!(!body["message"].as_str().unwrap().contains("no-such-product"));
}
