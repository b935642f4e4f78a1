//! Anonymous read-only chat over Twitch's IRC WebSocket gateway.
//!
//! Connects to wss://irc-ws.chat.twitch.tv, requests the tags/commands
//! capabilities, joins one channel as a `justinfan` guest and yields
//! `PRIVMSG` lines. Keepalive `PING`s are answered inside the session;
//! reconnection policy is left to the caller.

mod connection;

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use rand::Rng;

use crate::irc::{IrcMessage, parse_badges};

pub use connection::ChatSession;

pub const IRC_WS_URL: &str = "wss://irc-ws.chat.twitch.tv:443";
/// Twitch pings roughly every five minutes; silence beyond this is a dead socket.
const READ_TIMEOUT: Duration = Duration::from_secs(6 * 60);
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_CHANNEL_LEN: usize = 25;

/// Chat session configuration.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub url: String,
    pub channel: String,
    /// Login nick. `None` picks a random anonymous `justinfan` nick.
    pub nick: Option<String>,
}

impl ChatConfig {
    pub fn anonymous(channel: impl Into<String>) -> Self {
        Self {
            url: IRC_WS_URL.to_string(),
            channel: channel.into(),
            nick: None,
        }
    }
}

/// Normalize a channel login: trims, drops a leading `#`, lowercases and
/// rejects anything Twitch would not accept as a login.
pub fn normalize_channel(raw: &str) -> Option<String> {
    let channel = raw.trim().trim_start_matches('#').to_ascii_lowercase();
    let valid = !channel.is_empty()
        && channel.len() <= MAX_CHANNEL_LEN
        && channel
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    valid.then_some(channel)
}

pub fn anonymous_nick() -> String {
    let suffix: u32 = rand::thread_rng().gen_range(10_000..100_000);
    format!("justinfan{suffix}")
}

/// A chat message as received from the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Privmsg {
    pub channel: String,
    pub login: String,
    pub text: String,
    /// `/me` message (CTCP ACTION).
    pub is_action: bool,
    pub tags: HashMap<String, String>,
    pub received_at: DateTime<Utc>,
}

impl Privmsg {
    /// Build from a parsed `PRIVMSG` line. Returns `None` for other commands
    /// or lines missing the channel/sender.
    pub fn from_irc(msg: IrcMessage, received_at: DateTime<Utc>) -> Option<Self> {
        if msg.command != "PRIVMSG" || msg.params.len() < 2 {
            return None;
        }
        let login = msg.nick()?.to_string();
        let channel = msg.params[0].trim_start_matches('#').to_string();
        let raw_text = msg.trailing().unwrap_or_default();
        let (text, is_action) = match raw_text
            .strip_prefix("\u{1}ACTION ")
            .map(|t| t.trim_end_matches('\u{1}'))
        {
            Some(action) => (action.to_string(), true),
            None => (raw_text.to_string(), false),
        };

        Some(Self {
            channel,
            login,
            text,
            is_action,
            tags: msg.tags,
            received_at,
        })
    }

    /// Tag value, treating empty values as absent.
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn display_name(&self) -> &str {
        self.tag("display-name").unwrap_or(&self.login)
    }

    pub fn message_id(&self) -> Option<&str> {
        self.tag("id")
    }

    pub fn user_id(&self) -> Option<&str> {
        self.tag("user-id")
    }

    pub fn color(&self) -> Option<&str> {
        self.tag("color")
    }

    /// `(name, version)` pairs from the `badges` tag.
    pub fn badges(&self) -> Vec<(String, String)> {
        self.tag("badges").map(parse_badges).unwrap_or_default()
    }

    /// Server-side send time from `tmi-sent-ts` (milliseconds).
    pub fn sent_at(&self) -> Option<DateTime<Utc>> {
        let millis: i64 = self.tag("tmi-sent-ts")?.parse().ok()?;
        Utc.timestamp_millis_opt(millis).single()
    }
}

/// What a session hands back to its owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Our own JOIN was echoed: the channel is live for reading.
    Joined(String),
    Message(Privmsg),
    Notice(String),
}

/// How a single incoming line is handled.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum LineAction {
    Ignore,
    Pong(String),
    Event(SessionEvent),
    Reconnect,
    LoginFailed(String),
    ChannelUnavailable(String),
}

pub(crate) fn classify_line(msg: IrcMessage, own_nick: &str, received_at: DateTime<Utc>) -> LineAction {
    match msg.command.as_str() {
        "PING" => LineAction::Pong(msg.trailing().unwrap_or("tmi.twitch.tv").to_string()),
        "PRIVMSG" => match Privmsg::from_irc(msg, received_at) {
            Some(privmsg) => LineAction::Event(SessionEvent::Message(privmsg)),
            None => LineAction::Ignore,
        },
        "JOIN" => {
            if msg.nick().is_some_and(|n| n.eq_ignore_ascii_case(own_nick)) {
                let channel = msg
                    .params
                    .first()
                    .map(|c| c.trim_start_matches('#').to_string())
                    .unwrap_or_default();
                LineAction::Event(SessionEvent::Joined(channel))
            } else {
                LineAction::Ignore
            }
        }
        "RECONNECT" => LineAction::Reconnect,
        "NOTICE" => {
            let text = msg.trailing().unwrap_or_default().to_string();
            if text.contains("Login authentication failed") || text.contains("Login unsuccessful") {
                return LineAction::LoginFailed(text);
            }
            match msg.tag("msg-id") {
                Some("msg_channel_suspended") | Some("tos_ban") => {
                    LineAction::ChannelUnavailable(text)
                }
                _ => LineAction::Event(SessionEvent::Notice(text)),
            }
        }
        _ => LineAction::Ignore,
    }
}
