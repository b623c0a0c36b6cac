//! API route configuration.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tracing::info;

use super::handlers;
use super::state::AppState;

/// Create the router: health check, forbidden root, and the webhook on its
/// configured path.
pub fn api_routes(state: Arc<AppState>) -> Router {
    let webhook = state.config.server.webhook_route();
    info!(path = %webhook, "Registering webhook route");

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health_check))
        .route(&webhook, post(handlers::ssl_update_webhook))
        .with_state(state)
}
