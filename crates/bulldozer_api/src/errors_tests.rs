//! Tests for errors module

use super::*;
use http_body_util::BodyExt;

async fn body_of(error: ApiError) -> (StatusCode, ErrorResponse) {
    let response = error.into_response();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_bad_request_exposes_message() {
    let (status, body) = body_of(ApiError::bad_request("missing X-GitHub-Event header")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body.error.code, "ValidationError");
    assert_eq!(body.error.message, "missing X-GitHub-Event header");
}

#[tokio::test]
async fn test_unauthorized() {
    let (status, body) = body_of(ApiError::unauthorized("signature mismatch")).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body.error.code, "AuthenticationError");
}

#[tokio::test]
async fn test_internal_error_hides_details() {
    let error: ApiError = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire").into();

    let (status, body) = body_of(error).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body.error.code, "InternalError");
    assert!(!body.error.message.contains("disk on fire"));
}

#[test]
fn test_error_response_serialization() {
    let response = ErrorResponse {
        error: ErrorDetails {
            code: "ValidationError".to_string(),
            message: "bad".to_string(),
        },
    };

    let json = serde_json::to_value(&response).unwrap();

    assert_eq!(json["error"]["code"], "ValidationError");
    assert_eq!(json["error"]["message"], "bad");
}
