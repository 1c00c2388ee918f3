//! Tests for routes module

use super::*;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use bulldozer_core::{ConfigResolver, EventRouter, PullRequestProcessor};
use std::sync::Arc;
use test_utils::MockClientProvider;
use tower::ServiceExt;

fn router() -> Router {
    let processor = PullRequestProcessor::new(Arc::new(ConfigResolver::default()));
    let events = EventRouter::new(
        Arc::new(MockClientProvider::new()),
        Arc::new(processor),
        4,
    );
    create_router(AppState::new(events, Some("s3cret".to_string())))
}

#[tokio::test]
async fn test_health_route() {
    let request = Request::get("/api/health").body(Body::empty()).unwrap();

    let response = router().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_hook_only_accepts_post() {
    let request = Request::get("/api/github/hook").body(Body::empty()).unwrap();

    let response = router().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_unknown_route() {
    let request = Request::post("/webhook").body(Body::empty()).unwrap();

    let response = router().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
