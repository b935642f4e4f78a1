use std::collections::VecDeque;

use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message as Msg;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use super::*;
use crate::TwitchError;

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// One live connection to the chat gateway, joined to a single channel.
pub struct ChatSession {
    ws: WsStream,
    channel: String,
    nick: String,
    pending: VecDeque<String>,
}

impl ChatSession {
    /// Open the socket and send the capability, login and join commands.
    ///
    /// The JOIN is confirmed later through [`SessionEvent::Joined`].
    pub async fn connect(config: &ChatConfig) -> Result<Self, TwitchError> {
        let channel = normalize_channel(&config.channel)
            .ok_or_else(|| TwitchError::InvalidChannel(config.channel.clone()))?;
        let nick = config.nick.clone().unwrap_or_else(anonymous_nick);

        tracing::info!(url = %config.url, channel = %channel, "Connecting to Twitch chat");
        let (ws, _) = tokio::time::timeout(HANDSHAKE_TIMEOUT, connect_async(config.url.as_str()))
            .await
            .map_err(|_| TwitchError::Timeout)??;

        let mut session = Self {
            ws,
            channel,
            nick,
            pending: VecDeque::new(),
        };
        session
            .send_line("CAP REQ :twitch.tv/tags twitch.tv/commands")
            .await?;
        let nick_line = format!("NICK {}", session.nick);
        session.send_line(&nick_line).await?;
        let join_line = format!("JOIN #{}", session.channel);
        session.send_line(&join_line).await?;
        Ok(session)
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn nick(&self) -> &str {
        &self.nick
    }

    /// Wait for the next event worth reporting.
    ///
    /// Keepalive traffic is handled here. Server close, `RECONNECT` and read
    /// timeouts end the session with an error.
    pub async fn next_event(&mut self) -> Result<SessionEvent, TwitchError> {
        loop {
            while let Some(line) = self.pending.pop_front() {
                if let Some(event) = self.handle_line(&line).await? {
                    return Ok(event);
                }
            }

            match tokio::time::timeout(READ_TIMEOUT, self.ws.next()).await {
                Ok(Some(Ok(Msg::Text(text)))) => {
                    self.pending.extend(
                        text.lines()
                            .filter(|line| !line.trim().is_empty())
                            .map(ToOwned::to_owned),
                    );
                }
                Ok(Some(Ok(Msg::Ping(data)))) => {
                    let _ = self.ws.send(Msg::Pong(data)).await;
                }
                Ok(Some(Ok(Msg::Close(_)))) | Ok(None) => {
                    tracing::warn!(channel = %self.channel, "Twitch chat socket closed by server");
                    return Err(TwitchError::Closed);
                }
                Ok(Some(Ok(_))) => {}
                Ok(Some(Err(e))) => return Err(TwitchError::WebSocket(e)),
                Err(_) => {
                    tracing::warn!(channel = %self.channel, "Twitch chat read timeout");
                    return Err(TwitchError::Timeout);
                }
            }
        }
    }

    async fn handle_line(&mut self, line: &str) -> Result<Option<SessionEvent>, TwitchError> {
        let Some(msg) = IrcMessage::parse(line) else {
            tracing::debug!(line, "Skipping unparseable IRC line");
            return Ok(None);
        };
        match classify_line(msg, &self.nick, Utc::now()) {
            LineAction::Ignore => Ok(None),
            LineAction::Pong(payload) => {
                tracing::trace!("Twitch PING answered");
                self.send_line(&format!("PONG :{payload}")).await?;
                Ok(None)
            }
            LineAction::Event(event) => Ok(Some(event)),
            LineAction::Reconnect => Err(TwitchError::ReconnectRequested),
            LineAction::LoginFailed(text) => Err(TwitchError::LoginRejected(text)),
            LineAction::ChannelUnavailable(text) => {
                tracing::warn!(channel = %self.channel, notice = %text, "Twitch channel unavailable");
                Err(TwitchError::InvalidChannel(self.channel.clone()))
            }
        }
    }

    /// Close the socket. Errors are irrelevant at this point.
    pub async fn close(mut self) {
        let _ = self.ws.close(None).await;
    }

    async fn send_line(&mut self, line: &str) -> Result<(), TwitchError> {
        self.ws.send(Msg::Text(line.to_string().into())).await?;
        Ok(())
    }
}
