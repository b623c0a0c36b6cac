//! API route handlers.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{ConnectInfo, State};
use axum::http::StatusCode;
use axum::Json;
use tracing::{info, warn};

use super::error::{ApiError, ApiResult};
use super::state::AppState;
use super::types::{HealthResponse, WebhookAccepted, WebhookPayload};

/// Health check endpoint.
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse::default())
}

/// The root path is not served.
pub async fn root() -> ApiError {
    ApiError::Forbidden("Forbidden".to_string())
}

/// SSL certificate update webhook.
///
/// Validates the key against the configured rules and schedules the sync in
/// the background. The response never waits for the runner; the outcome of
/// the sync is only logged.
pub async fn ssl_update_webhook(
    State(state): State<Arc<AppState>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    payload: Result<Json<WebhookPayload>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<WebhookAccepted>)> {
    let syncer = state
        .syncer()
        .ok_or_else(|| ApiError::ServiceUnavailable("application state not initialized".to_string()))?;

    let Json(payload) = payload?;
    let key = payload.name.trim();
    let client_ip = connect_info.map_or_else(|| "unknown".to_string(), |ConnectInfo(addr)| addr.ip().to_string());
    info!(key = %key, client_ip = %client_ip, "Received SSL update request");

    if key.is_empty() {
        return Err(ApiError::BadRequest("key must not be empty".to_string()));
    }

    let rule = state.config.find_rule(key).ok_or_else(|| {
        warn!(key = %key, "No playbook mapping found");
        ApiError::NotFound(format!("no playbook mapping for key: {key}"))
    })?;

    let groups = state.config.resolve_server_groups(rule);
    if groups.is_empty() {
        warn!(key = %key, "Key has no usable server groups");
        return Err(ApiError::NotFound(format!("key {key} has no server groups configured")));
    }

    let response = WebhookAccepted {
        status: "accepted".to_string(),
        key: key.to_string(),
        server_groups: groups.keys().cloned().collect(),
        playbook_file: rule.playbook_file.clone(),
        message: "SSL certificate sync task started".to_string(),
    };

    syncer.spawn_sync(key.to_string(), Arc::clone(rule), groups);

    Ok((StatusCode::ACCEPTED, Json(response)))
}
