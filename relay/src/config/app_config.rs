//! Runtime application configuration loaded once from the environment.

use std::time::Duration;

use super::manager::SettingsManager;

/// Runtime configuration populated from the settings snapshot.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server_port: u16,
    pub twitch_channel: String,
    pub youtube_channel_id: String,
    pub youtube_api_key: String,
    pub youtube_live_id: String,
    pub youtube_daily_quota: u32,
    pub youtube_offline_check: Duration,
    pub youtube_skip_backlog: bool,
    pub reconnect_base: Duration,
    pub reconnect_max: Duration,
    pub reconnect_jitter: Duration,
    pub http_timeout: Duration,
    pub client_heartbeat: Duration,
    pub client_idle_timeout: Duration,
    pub client_queue_size: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_port: 3000,
            twitch_channel: String::new(),
            youtube_channel_id: String::new(),
            youtube_api_key: String::new(),
            youtube_live_id: String::new(),
            youtube_daily_quota: 10_000,
            youtube_offline_check: Duration::from_secs(600),
            youtube_skip_backlog: true,
            reconnect_base: Duration::from_millis(1000),
            reconnect_max: Duration::from_secs(30),
            reconnect_jitter: Duration::from_millis(1000),
            http_timeout: Duration::from_secs(8),
            client_heartbeat: Duration::from_secs(30),
            client_idle_timeout: Duration::from_secs(90),
            client_queue_size: 256,
        }
    }
}

impl AppConfig {
    /// Load configuration from the settings manager.
    pub fn load(sm: &SettingsManager) -> Result<Self, anyhow::Error> {
        let g = |key: &str| -> String { sm.get_setting(key).unwrap_or_default() };
        let d = Self::default();

        Ok(Self {
            server_port: parse_u16(&g("SERVER_PORT"), d.server_port),
            twitch_channel: g("TWITCH_CHANNEL"),
            youtube_channel_id: g("YOUTUBE_CHANNEL_ID"),
            youtube_api_key: g("YOUTUBE_API_KEY"),
            youtube_live_id: g("YOUTUBE_LIVE_ID"),
            youtube_daily_quota: parse_u32(&g("YOUTUBE_DAILY_QUOTA"), d.youtube_daily_quota),
            youtube_offline_check: secs(&g("YOUTUBE_OFFLINE_CHECK_SECS"), d.youtube_offline_check),
            youtube_skip_backlog: g("YOUTUBE_SKIP_BACKLOG") != "false",
            reconnect_base: millis(&g("RECONNECT_BASE_MS"), d.reconnect_base),
            reconnect_max: secs(&g("RECONNECT_MAX_SECS"), d.reconnect_max),
            reconnect_jitter: millis(&g("RECONNECT_JITTER_MS"), d.reconnect_jitter),
            http_timeout: secs(&g("HTTP_TIMEOUT_SECS"), d.http_timeout),
            client_heartbeat: secs(&g("CLIENT_HEARTBEAT_SECS"), d.client_heartbeat),
            client_idle_timeout: secs(&g("CLIENT_IDLE_TIMEOUT_SECS"), d.client_idle_timeout),
            client_queue_size: parse_u32(&g("CLIENT_QUEUE_SIZE"), 256) as usize,
        })
    }
}

fn parse_u16(s: &str, default: u16) -> u16 {
    if s.is_empty() {
        return default;
    }
    s.parse().unwrap_or(default)
}

fn parse_u32(s: &str, default: u32) -> u32 {
    if s.is_empty() {
        return default;
    }
    s.parse().unwrap_or(default)
}

fn parse_u64(s: &str) -> Option<u64> {
    s.parse().ok()
}

fn secs(s: &str, default: Duration) -> Duration {
    parse_u64(s).map_or(default, Duration::from_secs)
}

fn millis(s: &str, default: Duration) -> Duration {
    parse_u64(s).map_or(default, Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_uses_defaults_for_empty_environment() {
        let sm = SettingsManager::from_pairs(Vec::<(String, String)>::new());
        let config = AppConfig::load(&sm).unwrap();
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.youtube_daily_quota, 10_000);
        assert_eq!(config.youtube_offline_check, Duration::from_secs(600));
        assert!(config.youtube_skip_backlog);
        assert_eq!(config.reconnect_base, Duration::from_secs(1));
        assert_eq!(config.reconnect_max, Duration::from_secs(30));
        assert_eq!(config.client_queue_size, 256);
        assert!(config.twitch_channel.is_empty());
    }

    #[test]
    fn load_reads_overrides() {
        let sm = SettingsManager::from_pairs([
            ("SERVER_PORT", "8123"),
            ("TWITCH_CHANNEL", "streamer"),
            ("YOUTUBE_SKIP_BACKLOG", "false"),
            ("RECONNECT_BASE_MS", "250"),
            ("HTTP_TIMEOUT_SECS", "3"),
        ]);
        let config = AppConfig::load(&sm).unwrap();
        assert_eq!(config.server_port, 8123);
        assert_eq!(config.twitch_channel, "streamer");
        assert!(!config.youtube_skip_backlog);
        assert_eq!(config.reconnect_base, Duration::from_millis(250));
        assert_eq!(config.http_timeout, Duration::from_secs(3));
    }
}
