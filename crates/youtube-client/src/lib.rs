//! YouTube live chat client library.
//!
//! Provides a YouTube Data API v3 client for live broadcast discovery and
//! live chat polling, plus the daily quota governor that meters it.

pub mod api;
pub mod models;
pub mod quota;

pub use api::YouTubeApiClient;
pub use models::{AuthorDetails, LiveChatMessage, LiveChatMessageListResponse};
pub use quota::{QuotaCounter, QuotaGovernor};

/// Unified error type for the youtube-client crate.
#[derive(Debug, thiserror::Error)]
pub enum YouTubeError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("YouTube API key is not configured")]
    MissingApiKey,

    #[error("YouTube API error (status {status}, reason {reason}): {message}")]
    ApiError {
        status: u16,
        reason: String,
        message: String,
    },
}

/// Error reasons that mean the key or project can never make the call succeed.
const CONFIG_REASONS: &[&str] = &[
    "keyInvalid",
    "keyExpired",
    "accessNotConfigured",
    "ipRefererBlocked",
];
const QUOTA_REASONS: &[&str] = &["quotaExceeded", "dailyLimitExceeded"];
/// Reasons tied to one chat. The next broadcast may work, so rediscover.
const CHAT_GONE_REASONS: &[&str] = &[
    "liveChatEnded",
    "liveChatNotFound",
    "liveChatDisabled",
    "forbidden",
];

impl YouTubeError {
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::ApiError { reason, .. } if !reason.is_empty() => Some(reason),
            _ => None,
        }
    }

    /// Credentials/project problems. Retrying will not help.
    pub fn is_config_error(&self) -> bool {
        match self {
            Self::MissingApiKey => true,
            Self::ApiError { status, message, .. } => {
                self.reason().is_some_and(|r| CONFIG_REASONS.contains(&r))
                    || (*status == 400 && message.contains("API key not valid"))
            }
            _ => false,
        }
    }

    /// The project's daily quota is spent on Google's side.
    pub fn is_quota_exceeded(&self) -> bool {
        self.reason().is_some_and(|r| QUOTA_REASONS.contains(&r))
    }

    /// The live chat we were polling is gone or closed to this key.
    pub fn is_chat_gone(&self) -> bool {
        self.reason().is_some_and(|r| CHAT_GONE_REASONS.contains(&r))
    }

    /// Network failures, timeouts, 5xx and anything not classified above.
    pub fn is_transient(&self) -> bool {
        !self.is_config_error() && !self.is_quota_exceeded() && !self.is_chat_gone()
    }
}
