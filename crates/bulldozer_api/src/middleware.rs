//! Webhook authentication and request logging middleware
//!
//! GitHub signs every delivery with the app's webhook secret and sends the result in
//! the `X-Hub-Signature-256` header as `sha256=<hex>`. When a secret is configured,
//! requests without a valid signature are rejected before reaching a handler.

use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::errors::ApiError;
use crate::AppState;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the HMAC-SHA256 signature of the body.
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";

/// Header carrying GitHub's unique id for a delivery.
pub const DELIVERY_HEADER: &str = "x-github-delivery";

/// Largest webhook body accepted, matching GitHub's 25 MB payload cap.
pub const MAX_BODY_BYTES: usize = 25 * 1024 * 1024;

/// Returns `true` when `signature_header` is `sha256=<hex>` and the hex is the
/// HMAC-SHA256 of `body` under `secret`. The comparison runs in constant time.
pub fn verify_signature(body: &[u8], signature_header: &str, secret: &[u8]) -> bool {
    let Some(hex_part) = signature_header.strip_prefix("sha256=") else {
        return false;
    };

    let Ok(received) = hex::decode(hex_part) else {
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&received).is_ok()
}

/// Rejects deliveries whose signature does not match the configured secret.
///
/// Passes every request through when no secret is configured.
pub async fn signature_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(secret) = state.webhook_secret.clone() else {
        return Ok(next.run(request).await);
    };

    let (parts, body) = request.into_parts();
    let signature = parts
        .headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::unauthorized("Missing webhook signature"))?
        .to_string();

    let bytes = to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|e| ApiError::bad_request(format!("Failed to read request body: {e}")))?;

    if !verify_signature(&bytes, &signature, &secret) {
        tracing::warn!(
            delivery_id = parts
                .headers
                .get(DELIVERY_HEADER)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default(),
            "Rejected webhook with invalid signature"
        );
        return Err(ApiError::unauthorized("Invalid webhook signature"));
    }

    Ok(next.run(Request::from_parts(parts, Body::from(bytes))).await)
}

/// Request tracing middleware.
///
/// Logs the start and end of each request with the GitHub delivery id, when present.
pub async fn tracing_middleware(request: Request, next: Next) -> Response {
    let delivery_id = request
        .headers()
        .get(DELIVERY_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    tracing::debug!(
        delivery_id = %delivery_id,
        method = %request.method(),
        uri = %request.uri(),
        "Request started"
    );

    let response = next.run(request).await;

    tracing::debug!(
        delivery_id = %delivery_id,
        status = %response.status(),
        "Request completed"
    );

    response
}

#[cfg(test)]
#[path = "middleware_tests.rs"]
mod tests;
