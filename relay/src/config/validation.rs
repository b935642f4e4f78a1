//! Setting value validation.

use regex::Regex;
use std::sync::LazyLock;

static RE_TWITCH_CHANNEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#?[A-Za-z0-9_]{1,25}$").unwrap());
static RE_YOUTUBE_CHANNEL_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^UC[A-Za-z0-9_-]{22}$").unwrap());
static RE_YOUTUBE_VIDEO_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{11}$").unwrap());

/// Validate a setting value. Returns `Ok(())` if valid, or an error message.
///
/// Empty values are accepted for the optional identifiers; missing required
/// settings are reported through feature status instead.
pub fn validate_setting(key: &str, value: &str) -> Result<(), String> {
    match key {
        "SERVER_PORT" => validate_int_range(value, 1, 65_535)?,
        "TWITCH_CHANNEL" => {
            if !value.is_empty() && !RE_TWITCH_CHANNEL.is_match(value) {
                return Err("must be a channel login (letters, digits, underscore; max 25)".into());
            }
        }
        "YOUTUBE_CHANNEL_ID" => {
            if !value.is_empty() && !RE_YOUTUBE_CHANNEL_ID.is_match(value) {
                return Err("must be a channel id starting with 'UC' (24 characters)".into());
            }
        }
        "YOUTUBE_LIVE_ID" => {
            if !value.is_empty() && !RE_YOUTUBE_VIDEO_ID.is_match(value) {
                return Err("must be an 11 character video id".into());
            }
        }
        "YOUTUBE_API_KEY" => {
            if value.chars().any(char::is_whitespace) {
                return Err("must not contain whitespace".into());
            }
        }
        "YOUTUBE_DAILY_QUOTA" => validate_int_range(value, 1, 1_000_000)?,
        "YOUTUBE_OFFLINE_CHECK_SECS" => validate_int_range(value, 60, 86_400)?,
        "RECONNECT_BASE_MS" => validate_int_range(value, 100, 60_000)?,
        "RECONNECT_MAX_SECS" => validate_int_range(value, 1, 3_600)?,
        "RECONNECT_JITTER_MS" => validate_int_range(value, 0, 60_000)?,
        "HTTP_TIMEOUT_SECS" => validate_int_range(value, 1, 120)?,
        "CLIENT_HEARTBEAT_SECS" => validate_int_range(value, 5, 3_600)?,
        "CLIENT_IDLE_TIMEOUT_SECS" => validate_int_range(value, 10, 86_400)?,
        "CLIENT_QUEUE_SIZE" => validate_int_range(value, 8, 65_536)?,
        k if is_boolean_setting(k) => {
            if value != "true" && value != "false" {
                return Err("must be 'true' or 'false'".into());
            }
        }
        _ => {}
    }
    Ok(())
}

fn validate_int_range(value: &str, min: i64, max: i64) -> Result<(), String> {
    let v: i64 = value.parse().map_err(|_| "must be an integer")?;
    if v < min || v > max {
        return Err(format!("must be between {min} and {max}"));
    }
    Ok(())
}

fn is_boolean_setting(key: &str) -> bool {
    matches!(key, "YOUTUBE_SKIP_BACKLOG")
}
