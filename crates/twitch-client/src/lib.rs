//! Twitch chat client library.
//!
//! Provides an anonymous, read-only IRC-over-WebSocket chat session and the
//! IRCv3 line parser it is built on.

pub mod chat;
pub mod irc;

pub use chat::{ChatConfig, ChatSession, Privmsg, SessionEvent};
pub use irc::IrcMessage;

/// Unified error type for the twitch-client crate.
#[derive(Debug, thiserror::Error)]
pub enum TwitchError {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Invalid channel name: {0:?}")]
    InvalidChannel(String),

    #[error("Login rejected by Twitch: {0}")]
    LoginRejected(String),

    #[error("Server requested reconnect")]
    ReconnectRequested,

    #[error("Connection closed by server")]
    Closed,

    #[error("Connection timeout")]
    Timeout,
}

impl TwitchError {
    /// Errors that will fail the same way on every retry.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::InvalidChannel(_) | Self::LoginRejected(_))
    }
}
