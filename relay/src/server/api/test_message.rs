use axum::{Json, extract::State};
use serde_json::{Value, json};

use crate::app::SharedState;
use crate::event::ChatEvent;

/// Broadcast a system test message to every connected overlay.
pub async fn send_test(State(state): State<SharedState>) -> Json<Value> {
    let event = ChatEvent::system("Test message from chat relay");
    let delivered = state.broadcaster().publish(&event);
    tracing::info!(delivered, "Test message sent");

    Json(json!({
        "success": true,
        "id": event.id,
        "delivered": delivered,
    }))
}
