//! Integration tests for host-based site routing
//!
//! Drives the full router (health probes, binding middleware, site endpoint)
//! against an in-memory site store.
//!
//! ## Running Tests
//! ```bash
//! cargo test -p multihost-api --test site_routing
//! ```

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use multihost_api::{
    config::{Config, LogFormat, ResolverSettings},
    routes::create_router,
    AppState, HostResolver,
};
use multihost_shared::{MemorySiteStore, Site, SiteId};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

// ============================================================================
// Test Utilities
// ============================================================================

fn test_config(auto_www: bool, redirect: bool) -> Config {
    Config {
        bind_address: "127.0.0.1:0".to_string(),
        database_url: "postgres://unused".to_string(),
        database_max_connections: 1,
        redis_url: None,
        resolver: ResolverSettings {
            auto_www,
            default_site_id: Some(SiteId(1)),
        },
        site_cache_ttl: Duration::from_secs(300),
        redirect_on_no_match: redirect,
        redirect_url: redirect.then(|| "https://main.test/".to_string()),
        trust_forwarded_host: false,
        log_format: LogFormat::Pretty,
    }
}

fn test_store() -> Arc<MemorySiteStore> {
    Arc::new(MemorySiteStore::with_sites([
        Site::new(1, "main.test").with_name("Main"),
        Site::new(5, "shop.test")
            .with_name("Shop")
            .with_settings(serde_json::json!({ "theme": "dark" })),
        Site::new(6, "www.blog.test").with_name("Blog"),
    ]))
}

fn test_app(store: Arc<MemorySiteStore>, config: Config) -> Router {
    let resolver = HostResolver::new(store.clone(), config.resolver.clone());
    create_router(AppState::new(config, store, resolver))
}

fn get(uri: &str, host: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::HOST, host)
        .body(Body::empty())
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_site_endpoint_returns_bound_site() {
    let app = test_app(test_store(), test_config(true, true));

    let response = app.oneshot(get("/api/v1/site", "shop.test:443")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["id"], 5);
    assert_eq!(body["domain"], "shop.test");
    assert_eq!(body["name"], "Shop");
    assert_eq!(body["settings"]["theme"], "dark");
    assert_eq!(body["overridden"], false);
}

#[tokio::test]
async fn test_www_variant_is_bound() {
    let app = test_app(test_store(), test_config(true, true));

    let response = app.oneshot(get("/api/v1/site", "blog.test")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["id"], 6);
}

#[tokio::test]
async fn test_www_variant_rejected_when_auto_www_disabled() {
    let app = test_app(test_store(), test_config(false, true));

    let response = app.oneshot(get("/api/v1/site", "blog.test")).await.unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        "https://main.test/"
    );
}

#[tokio::test]
async fn test_unknown_host_is_rejected() {
    let app = test_app(test_store(), test_config(true, false));

    let response = app.oneshot(get("/api/v1/site", "unknown.test")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["error"]["code"], "NO_MATCHING_SITE");
}

#[tokio::test]
async fn test_default_site_host_is_rejected() {
    let app = test_app(test_store(), test_config(true, true));

    let response = app.oneshot(get("/api/v1/site", "main.test")).await.unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
}

#[tokio::test]
async fn test_repeat_requests_hit_store_once() {
    let store = test_store();
    let app = test_app(store.clone(), test_config(true, true));

    let response = app.clone().oneshot(get("/api/v1/site", "shop.test")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let lookups = store.lookups();
    assert_eq!(lookups, 1);

    let response = app.oneshot(get("/api/v1/site", "shop.test")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(store.lookups(), lookups);
}

#[tokio::test]
async fn test_store_outage_returns_503() {
    let store = test_store();
    let app = test_app(store.clone(), test_config(true, true));
    store.set_available(false);

    let response = app.clone().oneshot(get("/api/v1/site", "shop.test")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let response = app.oneshot(get("/health/ready", "shop.test")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_health_routes_skip_site_binding() {
    let app = test_app(test_store(), test_config(true, true));

    let response = app.clone().oneshot(get("/health/live", "unknown.test")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(get("/health", "unknown.test")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["store"], "healthy");
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let app = test_app(test_store(), test_config(true, true));

    let response = app.oneshot(get("/nope", "shop.test")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["error"]["code"], "NOT_FOUND");
}
