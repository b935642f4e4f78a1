//! Normalized chat events and the JSON frames pushed to overlay clients.
//!
//! Frame shape: `{ "type": <platform|"welcome">, "platform": ..., "data": {...} }`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Where an event came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Twitch,
    Youtube,
    System,
}

impl Platform {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Twitch => "twitch",
            Self::Youtube => "youtube",
            Self::System => "system",
        }
    }

    /// Human-readable name used in system notices.
    pub fn label(self) -> &'static str {
        match self {
            Self::Twitch => "Twitch",
            Self::Youtube => "YouTube",
            Self::System => "System",
        }
    }
}

/// Badge flags, serialized with the `isX` keys the overlay reads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Badges {
    #[serde(rename = "isBroadcaster")]
    pub broadcaster: bool,
    #[serde(rename = "isModerator")]
    pub moderator: bool,
    #[serde(rename = "isVIP")]
    pub vip: bool,
    #[serde(rename = "isSubscriber")]
    pub subscriber: bool,
    #[serde(rename = "isOwner")]
    pub owner: bool,
    #[serde(rename = "isVerified")]
    pub verified: bool,
    #[serde(rename = "isMember")]
    pub member: bool,
}

impl Badges {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// One normalized chat message or system notice. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatEvent {
    pub id: String,
    pub platform: Platform,
    pub user: String,
    pub message: String,
    #[serde(rename = "timestamp")]
    pub timestamp_utc: DateTime<Utc>,
    pub badges: Badges,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl ChatEvent {
    /// A relay-generated notice (connector transitions, test messages).
    pub fn system(message: impl Into<String>) -> Self {
        Self {
            id: format!("system-{}", uuid::Uuid::new_v4()),
            platform: Platform::System,
            user: "System".to_string(),
            message: message.into(),
            timestamp_utc: Utc::now(),
            badges: Badges::default(),
            color: None,
        }
    }

    /// Client frame for this event.
    pub fn to_frame(&self) -> Value {
        json!({
            "type": self.platform.as_str(),
            "platform": self.platform.as_str(),
            "data": self,
        })
    }
}

/// Frame sent to a client right after it connects, before any chat event.
pub fn welcome_frame(client_id: &str, connectors: &impl Serialize) -> Value {
    json!({
        "type": "welcome",
        "platform": Platform::System.as_str(),
        "data": {
            "message": "Connected to chat relay",
            "timestamp": Utc::now().to_rfc3339(),
            "clientId": client_id,
            "connectors": connectors,
        }
    })
}

/// Reply to an application-level `{"type":"ping"}` from a client.
pub fn pong_frame() -> Value {
    json!({
        "type": "pong",
        "timestamp": Utc::now().to_rfc3339(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> ChatEvent {
        ChatEvent {
            id: "abc".into(),
            platform: Platform::Twitch,
            user: "Foo".into(),
            message: "hello".into(),
            timestamp_utc: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            badges: Badges {
                broadcaster: true,
                ..Badges::default()
            },
            color: Some("#FF0000".into()),
        }
    }

    #[test]
    fn chat_frame_has_type_platform_and_data() {
        let frame = sample().to_frame();
        assert_eq!(frame["type"], "twitch");
        assert_eq!(frame["platform"], "twitch");
        assert_eq!(frame["data"]["user"], "Foo");
        assert_eq!(frame["data"]["message"], "hello");
        assert_eq!(frame["data"]["timestamp"], "2023-11-14T22:13:20Z");
        assert_eq!(frame["data"]["badges"]["isBroadcaster"], true);
        assert_eq!(frame["data"]["badges"]["isVIP"], false);
        assert_eq!(frame["data"]["color"], "#FF0000");
    }

    #[test]
    fn color_is_omitted_when_absent() {
        let event = ChatEvent {
            color: None,
            ..sample()
        };
        let frame = event.to_frame();
        assert!(frame["data"].get("color").is_none());
    }

    #[test]
    fn system_events_are_unique_and_badge_free() {
        let a = ChatEvent::system("YouTube: connected");
        let b = ChatEvent::system("YouTube: connected");
        assert_ne!(a.id, b.id);
        assert!(a.id.starts_with("system-"));
        assert_eq!(a.platform, Platform::System);
        assert!(a.badges.is_empty());
        assert_eq!(a.to_frame()["type"], "system");
    }

    #[test]
    fn welcome_frame_carries_client_id_and_connectors() {
        let frame = welcome_frame("client-1", &json!({ "twitch": { "status": "connected" } }));
        assert_eq!(frame["type"], "welcome");
        assert_eq!(frame["data"]["clientId"], "client-1");
        assert_eq!(frame["data"]["connectors"]["twitch"]["status"], "connected");
    }
}
