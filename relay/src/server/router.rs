use axum::{Router, routing::get};
use tower_http::cors::CorsLayer;

use super::{api, sse, websocket};
use crate::app::SharedState;

/// Create the axum router with all routes.
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        // --- Push channels ---
        .route("/ws", get(websocket::ws_handler))
        .route("/events", get(sse::sse_handler))
        // --- Diagnostics ---
        .route("/health", get(api::health::health))
        .route("/status", get(api::health::status))
        .route("/test", get(api::test_message::send_test).post(api::test_message::send_test))
        // --- Overlay bootstrap ---
        .route("/config.js", get(api::client_config::config_js))
        .fallback(api::not_found)
        .layer(CorsLayer::permissive())
        .with_state(state)
}
