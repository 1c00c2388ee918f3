//! HTTP request handlers

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use bulldozer_core::{BulldozerError, Notification};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::ApiError;
use crate::middleware::DELIVERY_HEADER;
use crate::AppState;

/// Header naming the webhook event type.
pub const EVENT_HEADER: &str = "x-github-event";

/// Acknowledgement returned for every accepted delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookResponse {
    /// `accepted` when work was queued, `ignored` otherwise
    pub status: String,
}

/// POST /api/github/hook
///
/// Parses the delivery and queues the affected pull requests for processing. The
/// response is sent before any GitHub call is made.
pub async fn receive_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<WebhookResponse>), ApiError> {
    let event_type = headers
        .get(EVENT_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::bad_request("Missing X-GitHub-Event header"))?;
    let delivery_id = headers
        .get(DELIVERY_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    let status = match Notification::parse(event_type, &body) {
        Ok(Some(notification)) => {
            info!(
                event_type,
                delivery_id,
                installation_id = notification.installation_id,
                owner = %notification.owner,
                repo = %notification.repo,
                "Queued webhook notification"
            );
            state.events.submit(notification);
            "accepted"
        }
        Ok(None) => {
            debug!(event_type, delivery_id, "Ignoring webhook delivery");
            "ignored"
        }
        Err(e @ BulldozerError::InvalidPayload { .. }) => {
            return Err(ApiError::bad_request(e.to_string()));
        }
        Err(e) => return Err(ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, e)),
    };

    Ok((
        StatusCode::ACCEPTED,
        Json(WebhookResponse {
            status: status.to_string(),
        }),
    ))
}

/// GET /api/health
///
/// Returns service health status with version and timestamp.
pub async fn health_check() -> Json<HealthCheckResponse> {
    Json(HealthCheckResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheckResponse {
    /// Always `healthy` while the process serves requests
    pub status: String,

    /// Service version
    pub version: String,

    /// Current timestamp (ISO 8601)
    pub timestamp: String,
}

#[cfg(test)]
#[path = "handlers_tests.rs"]
mod tests;
