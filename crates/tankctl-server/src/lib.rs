//! Tank control server: HTTP surface, authentication and background tasks.

pub mod api;
pub mod background;
pub mod config;
pub mod middleware;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Extension, Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tankctl_control::Dispatcher;
use tankctl_identity::CredentialDirectory;
use tower_http::trace::TraceLayer;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Tank operations over the store.
    pub dispatcher: Arc<Dispatcher>,
    /// Registered principals.
    pub directory: Arc<CredentialDirectory>,
}

/// Maximum request body size (64 KiB). Method calls carry a handful of scalars.
const MAX_REQUEST_BODY_BYTES: usize = 64 * 1024;

/// Health check handler.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    let tank_routes = Router::new()
        .route("/api/tank", get(api::read_attributes_handler))
        .route(
            "/api/tank/methods/getTankSystemParams",
            post(api::get_tank_system_params_handler),
        )
        .route(
            "/api/tank/methods/setThreshold",
            post(api::set_threshold_handler),
        )
        .route(
            "/api/tank/methods/reportFillLevel",
            post(api::report_fill_level_handler),
        )
        .route(
            "/api/tank/history/{quantity}",
            get(api::read_history_handler),
        )
        .layer(axum::middleware::from_fn(middleware::auth_middleware));

    Router::new()
        .route("/health", get(health))
        .merge(tank_routes)
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(Arc::new(state)))
}
