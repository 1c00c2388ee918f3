//! Tests for handlers module

use super::*;
use crate::routes::create_router;
use axum::body::Body;
use axum::http::Request;
use bulldozer_core::{ConfigResolver, EventRouter, PullRequestProcessor};
use http_body_util::BodyExt;
use serde_json::json;
use std::sync::Arc;
use test_utils::MockClientProvider;
use tower::ServiceExt;

fn state() -> AppState {
    let processor = PullRequestProcessor::new(Arc::new(ConfigResolver::default()));
    let events = EventRouter::new(
        Arc::new(MockClientProvider::new()),
        Arc::new(processor),
        4,
    );
    AppState::new(events, None)
}

fn delivery(event_type: Option<&str>, body: String) -> Request<Body> {
    let mut builder = Request::post("/api/github/hook").header(DELIVERY_HEADER, "d-1");
    if let Some(event_type) = event_type {
        builder = builder.header(EVENT_HEADER, event_type);
    }
    builder.body(Body::from(body)).unwrap()
}

async fn send(request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = create_router(state()).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn pull_request_payload(action: &str) -> String {
    json!({
        "action": action,
        "number": 7,
        "installation": { "id": 42 },
        "repository": { "name": "widgets", "owner": { "login": "octo-org" } },
    })
    .to_string()
}

#[tokio::test]
async fn test_health_check() {
    let Json(response) = health_check().await;

    assert_eq!(response.status, "healthy");
    assert_eq!(response.version, env!("CARGO_PKG_VERSION"));
    assert!(chrono::DateTime::parse_from_rfc3339(&response.timestamp).is_ok());
}

#[tokio::test]
async fn test_relevant_delivery_is_accepted() {
    let (status, body) = send(delivery(
        Some("pull_request"),
        pull_request_payload("labeled"),
    ))
    .await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["status"], "accepted");
}

#[tokio::test]
async fn test_filtered_delivery_is_ignored() {
    let (status, body) = send(delivery(
        Some("pull_request"),
        pull_request_payload("closed"),
    ))
    .await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["status"], "ignored");
}

#[tokio::test]
async fn test_unknown_event_is_ignored() {
    let (status, body) = send(delivery(Some("ping"), "{}".to_string())).await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["status"], "ignored");
}

#[tokio::test]
async fn test_malformed_payload_is_rejected() {
    let (status, body) = send(delivery(
        Some("pull_request"),
        r#"{"action": "opened""#.to_string(),
    ))
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "ValidationError");
}

#[tokio::test]
async fn test_missing_event_header_is_rejected() {
    let (status, body) = send(delivery(None, pull_request_payload("opened"))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "Missing X-GitHub-Event header");
}
