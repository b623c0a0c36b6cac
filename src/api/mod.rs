//! HTTP webhook server for certsync.
//!
//! Exposes:
//!
//! - `GET /health`: liveness probe
//! - `GET /`: always 403
//! - `POST /<webhook_path>`: accepts `{"name": "<key>"}`, validates it
//!   against the configured rules and schedules a background sync
//!
//! # Example
//!
//! ```rust,ignore
//! use certsync::api::{AppState, WebhookServer};
//!
//! let state = Arc::new(AppState::with_syncer(config, syncer));
//! WebhookServer::new(state).run_with_shutdown(shutdown_signal()).await?;
//! ```

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;
pub mod types;

use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{ConnectInfo, Request};
use axum::http::Extensions;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

pub use error::{ApiError, ApiResult, ErrorResponse};
pub use state::AppState;
pub use types::*;

/// The webhook server.
pub struct WebhookServer {
    state: Arc<AppState>,
}

impl WebhookServer {
    /// Create a new server over the given state.
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Build the router with all routes and layers.
    pub fn router(&self) -> Router {
        with_layers(routes::api_routes(self.state.clone()))
    }

    /// Run the server until `shutdown` resolves.
    pub async fn run_with_shutdown(
        self,
        shutdown: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> Result<(), std::io::Error> {
        let addr = self.state.config.server.bind_address();
        let router = self.router();

        info!("Starting SSL certificate webhook on {}", addr);

        let listener = TcpListener::bind(&addr).await?;
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await
    }
}

/// Wrap a router in the request middleware stack.
///
/// Panics are turned into responses before the access log sees them, so a
/// panicking request still gets its log line.
fn with_layers(router: Router) -> Router {
    router
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(middleware::from_fn(log_requests))
        .layer(TraceLayer::new_for_http())
}

fn client_ip(extensions: &Extensions) -> String {
    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map_or_else(|| "unknown".to_string(), |ConnectInfo(addr)| addr.ip().to_string())
}

/// Access log: one line per request.
async fn log_requests(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let client_ip = client_ip(request.extensions());
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    info!(
        "{} - \"{} {}\" {} {:.3}s",
        client_ip,
        method,
        path,
        response.status().as_u16(),
        start.elapsed().as_secs_f64()
    );
    response
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!(panic = %detail, "Request handler panicked");
    ApiError::Internal("internal server error".to_string()).into_response()
}
