//! All setting definitions with their default values.

use std::collections::HashMap;
use std::sync::LazyLock;

/// `(key, default, secret, required, description)`.
type DefTuple = (&'static str, &'static str, bool, bool, &'static str);

const DEFS: &[DefTuple] = &[
    ("SERVER_PORT", "3000", false, false, "HTTP/WebSocket listen port (alias: PORT)"),
    ("TWITCH_CHANNEL", "", false, true, "Twitch channel login to read chat from"),
    ("YOUTUBE_CHANNEL_ID", "", false, true, "YouTube channel id (UC...) to watch for live broadcasts"),
    ("YOUTUBE_API_KEY", "", true, true, "YouTube Data API v3 key"),
    ("YOUTUBE_LIVE_ID", "", false, false, "Fixed live video id; skips broadcast search"),
    ("YOUTUBE_DAILY_QUOTA", "10000", false, false, "Daily YouTube API quota budget in units"),
    ("YOUTUBE_OFFLINE_CHECK_SECS", "600", false, false, "Seconds between live checks while the channel is offline"),
    ("YOUTUBE_SKIP_BACKLOG", "true", false, false, "Drop the chat history returned by the first poll"),
    ("RECONNECT_BASE_MS", "1000", false, false, "Base reconnect delay in milliseconds"),
    ("RECONNECT_MAX_SECS", "30", false, false, "Upper bound for reconnect delay in seconds"),
    ("RECONNECT_JITTER_MS", "1000", false, false, "Maximum random jitter added to reconnect delays"),
    ("HTTP_TIMEOUT_SECS", "8", false, false, "Timeout for outbound HTTP calls"),
    ("CLIENT_HEARTBEAT_SECS", "30", false, false, "Interval between pings to overlay clients"),
    ("CLIENT_IDLE_TIMEOUT_SECS", "90", false, false, "Drop overlay clients idle for longer than this"),
    ("CLIENT_QUEUE_SIZE", "256", false, false, "Per-client outbound queue capacity"),
];

/// A single setting definition.
#[derive(Debug, Clone)]
pub struct SettingDef {
    pub key: &'static str,
    pub default: &'static str,
    pub secret: bool,
    pub required: bool,
    pub description: &'static str,
}

/// Global setting definitions indexed by key.
pub static DEFAULT_SETTINGS: LazyLock<HashMap<&'static str, SettingDef>> = LazyLock::new(|| {
    DEFS.iter()
        .map(|&(key, default, secret, required, description)| {
            (
                key,
                SettingDef {
                    key,
                    default,
                    secret,
                    required,
                    description,
                },
            )
        })
        .collect()
});
