//! HTTP routing configuration
//!
//! - POST   /api/github/hook - Webhook intake (signature checked when a secret is set)
//! - GET    /api/health - Health check

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tower_http::{
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::{handlers, middleware as api_middleware, AppState};

/// Create the complete API router with all routes configured.
pub fn create_router(state: AppState) -> Router {
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    let timeout_layer = TimeoutLayer::new(Duration::from_secs(30));

    let github_routes = Router::new()
        .route("/hook", post(handlers::receive_webhook))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            api_middleware::signature_middleware,
        ));

    let api = Router::new()
        .nest("/github", github_routes)
        .route("/health", get(handlers::health_check))
        .layer(middleware::from_fn(api_middleware::tracing_middleware))
        .layer(timeout_layer)
        .layer(trace_layer)
        .with_state(state);

    Router::new().nest("/api", api)
}

#[cfg(test)]
#[path = "routes_tests.rs"]
mod tests;
