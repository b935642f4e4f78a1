use axum::{
    extract::State,
    http::{HeaderMap, header},
    response::IntoResponse,
};
use serde_json::json;

use crate::app::SharedState;

/// Overlay bootstrap script: channel names plus the push endpoints as seen
/// from the requesting browser.
pub async fn config_js(State(state): State<SharedState>, headers: HeaderMap) -> impl IntoResponse {
    let config = state.config();
    let host = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .filter(|h| !h.is_empty())
        .map(ToOwned::to_owned)
        .unwrap_or_else(|| format!("localhost:{}", state.server_port()));
    let secure = headers
        .get("x-forwarded-proto")
        .and_then(|h| h.to_str().ok())
        .is_some_and(|proto| proto.eq_ignore_ascii_case("https"));
    let (http, ws) = if secure { ("https", "wss") } else { ("http", "ws") };

    let client_config = json!({
        "twitchChannel": config.twitch_channel,
        "youtubeChannelId": config.youtube_channel_id,
        "youtubeLiveId": config.youtube_live_id,
        "serverUrl": format!("{http}://{host}"),
        "wsUrl": format!("{ws}://{host}/ws"),
        "sseUrl": format!("{http}://{host}/events"),
    });
    // Overlay pages read a global `CONFIG`.
    let body = format!("const CONFIG = {client_config};\n");

    (
        [
            (header::CONTENT_TYPE, "application/javascript; charset=utf-8"),
            (header::CACHE_CONTROL, "no-store"),
        ],
        body,
    )
}
