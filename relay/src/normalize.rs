//! Maps upstream chat payloads onto [`ChatEvent`].
//!
//! Pure functions only: no I/O, no clock reads. The receive instant travels
//! inside the payload so timestamps stay deterministic under test.

use chrono::{DateTime, Utc};
use twitch_client::Privmsg;
use youtube_client::LiveChatMessage;

use crate::event::{Badges, ChatEvent, Platform};

const ANONYMOUS: &str = "Anonymous";

/// A raw message from one of the upstream connectors.
#[derive(Debug, Clone)]
pub enum UpstreamPayload {
    Twitch(Privmsg),
    YouTube {
        message: LiveChatMessage,
        received_at: DateTime<Utc>,
    },
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("{platform:?} payload has no message text")]
    MissingText { platform: Platform },
}

pub fn normalize(payload: UpstreamPayload) -> Result<ChatEvent, NormalizeError> {
    match payload {
        UpstreamPayload::Twitch(msg) => normalize_twitch(&msg),
        UpstreamPayload::YouTube {
            message,
            received_at,
        } => normalize_youtube(&message, received_at),
    }
}

fn normalize_twitch(msg: &Privmsg) -> Result<ChatEvent, NormalizeError> {
    let text = msg.text.trim();
    if text.is_empty() {
        return Err(NormalizeError::MissingText {
            platform: Platform::Twitch,
        });
    }

    let user = non_empty(msg.display_name())
        .or_else(|| non_empty(&msg.login))
        .unwrap_or(ANONYMOUS)
        .to_string();
    let sent_at = msg.sent_at();
    let id = match msg.message_id() {
        Some(id) => id.to_string(),
        None => format!(
            "twitch-{}-{}",
            msg.login,
            msg.tag("tmi-sent-ts")
                .map(ToOwned::to_owned)
                .unwrap_or_else(|| msg.received_at.timestamp_millis().to_string())
        ),
    };

    Ok(ChatEvent {
        id,
        platform: Platform::Twitch,
        user,
        message: text.to_string(),
        timestamp_utc: sent_at.unwrap_or(msg.received_at),
        badges: twitch_badges(msg),
        color: msg.color().map(ToOwned::to_owned),
    })
}

fn twitch_badges(msg: &Privmsg) -> Badges {
    let mut badges = Badges::default();
    for (name, _) in msg.badges() {
        match name.as_str() {
            "broadcaster" => badges.broadcaster = true,
            "moderator" => badges.moderator = true,
            "vip" => badges.vip = true,
            "subscriber" | "founder" => badges.subscriber = true,
            _ => {}
        }
    }
    if msg.tag("mod") == Some("1") {
        badges.moderator = true;
    }
    badges
}

fn normalize_youtube(
    msg: &LiveChatMessage,
    received_at: DateTime<Utc>,
) -> Result<ChatEvent, NormalizeError> {
    let text = msg.text().ok_or(NormalizeError::MissingText {
        platform: Platform::Youtube,
    })?;

    let author = msg.author_details.as_ref();
    let user = author
        .and_then(|a| a.display_name.as_deref())
        .and_then(non_empty)
        .unwrap_or(ANONYMOUS)
        .to_string();
    let published_at = msg.snippet.published_at.as_deref();
    let id = match msg.id.as_deref().and_then(non_empty) {
        Some(id) => id.to_string(),
        None => format!(
            "youtube-{}-{}",
            msg.author_channel_id().unwrap_or("unknown"),
            published_at
                .map(ToOwned::to_owned)
                .unwrap_or_else(|| received_at.timestamp_millis().to_string())
        ),
    };
    let timestamp_utc = published_at
        .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
        .map(|ts| ts.with_timezone(&Utc))
        .unwrap_or(received_at);

    let badges = author
        .map(|a| Badges {
            owner: a.is_chat_owner,
            moderator: a.is_chat_moderator,
            verified: a.is_verified,
            member: a.is_chat_sponsor,
            ..Badges::default()
        })
        .unwrap_or_default();

    Ok(ChatEvent {
        id,
        platform: Platform::Youtube,
        user,
        message: text.to_string(),
        timestamp_utc,
        badges,
        color: None,
    })
}

fn non_empty(s: &str) -> Option<&str> {
    let s = s.trim();
    (!s.is_empty()).then_some(s)
}
