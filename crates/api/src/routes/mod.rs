//! API routes

pub mod health;
pub mod site;

use axum::{middleware, routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::{binding::site_binding_middleware, error::ApiError, state::AppState};

/// Create all API routes
pub fn create_router(state: AppState) -> Router {
    let binding_state = state.binding_state();

    // Health check routes (at root level for infrastructure monitoring, no site binding)
    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness));

    // Site-scoped API routes - under /api/v1
    let site_routes = Router::new()
        .route("/site", get(site::current_site))
        .route_layer(middleware::from_fn_with_state(
            binding_state,
            site_binding_middleware,
        ));

    Router::new()
        .merge(health_routes)
        .nest("/api/v1", site_routes)
        .fallback(|| async { ApiError::NotFound })
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
