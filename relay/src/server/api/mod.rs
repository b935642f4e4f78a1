//! Plain HTTP endpoints next to the push channels.

pub mod client_config;
pub mod health;
pub mod test_message;


use axum::{
    Json,
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
};
use serde_json::json;

/// JSON 404 for unknown paths.
pub async fn not_found(uri: Uri) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "Not Found",
            "path": uri.path(),
        })),
    )
        .into_response()
}
