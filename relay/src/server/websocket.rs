use axum::{
    body::Bytes,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};

use crate::app::SharedState;
use crate::broadcaster::{Broadcaster, ClientRegistration, Outbound, TransportKind};
use crate::event::pong_frame;

/// WebSocket upgrade handler.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<SharedState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: SharedState) {
    let (mut sender, mut receiver) = socket.split();
    let ClientRegistration {
        id: client_id,
        receiver: mut queue,
        guard,
    } = state.broadcaster().register_client(TransportKind::WebSocket);

    // Drain this client's queue onto the socket
    let mut send_task = tokio::spawn(async move {
        while let Some(item) = queue.recv().await {
            let msg = match item {
                Outbound::Frame(text) => Message::Text((&*text).into()),
                Outbound::Ping => Message::Ping(Bytes::new()),
            };
            if sender.send(msg).await.is_err() {
                break;
            }
        }
        let _ = sender.close().await;
    });

    // Any inbound frame (including pongs) counts as activity
    let broadcaster = state.broadcaster().clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            guard.touch();
            match msg {
                Message::Text(text) => handle_client_message(text.as_str(), guard.id(), &broadcaster),
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    let shutdown = state.shutdown_token().clone();
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
        _ = shutdown.cancelled() => {
            send_task.abort();
            recv_task.abort();
        }
    }
    tracing::debug!(client_id = %client_id, "WebSocket session ended");
}

/// Route incoming client messages. Only the application-level ping is
/// understood; the pong goes back to the sender alone.
fn handle_client_message(text: &str, client_id: &str, broadcaster: &Broadcaster) {
    let Ok(msg) = serde_json::from_str::<serde_json::Value>(text) else {
        tracing::debug!(client_id, "Ignoring non-JSON client message");
        return;
    };
    match msg.get("type").and_then(|t| t.as_str()).unwrap_or("") {
        "ping" => {
            broadcaster.send_to_client(client_id, &pong_frame());
        }
        other => tracing::debug!(client_id, kind = other, "Ignoring client message"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::StatusBoard;
    use std::time::Duration;

    #[tokio::test]
    async fn ping_is_answered_to_sender_only() {
        let broadcaster = Broadcaster::new(StatusBoard::new(), 8, Duration::from_secs(90));
        let mut a = broadcaster.register_client(TransportKind::WebSocket);
        let mut b = broadcaster.register_client(TransportKind::WebSocket);
        let _ = a.receiver.recv().await;
        let _ = b.receiver.recv().await;

        handle_client_message(r#"{"type":"ping"}"#, &a.id, &broadcaster);
        handle_client_message(r#"{"type":"hello"}"#, &a.id, &broadcaster);
        handle_client_message("not json", &a.id, &broadcaster);

        let Some(Outbound::Frame(text)) = a.receiver.recv().await else {
            panic!("expected pong frame");
        };
        let frame: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(frame["type"], "pong");
        assert!(a.receiver.try_recv().is_err());
        assert!(b.receiver.try_recv().is_err());
    }
}
