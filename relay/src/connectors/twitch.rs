//! Twitch chat connector: anonymous IRC session under a reconnect supervisor.

use tokio_util::sync::CancellationToken;
use twitch_client::chat::normalize_channel;
use twitch_client::{ChatConfig, ChatSession, SessionEvent, TwitchError};

use super::{Backoff, ConnectorContext, EventEmitter, StatusReporter};
use crate::background::sleep_or_cancel;
use crate::event::Platform;
use crate::normalize::UpstreamPayload;

enum SessionEnd {
    Cancelled,
    Failed(TwitchError),
}

/// Supervisor loop. Returns on cancellation or a terminal error.
pub async fn run(ctx: ConnectorContext, config: ChatConfig, mut backoff: Backoff, cancel: CancellationToken) {
    let mut reporter = StatusReporter::new(Platform::Twitch, ctx.clone());

    if config.channel.trim().is_empty() {
        reporter.error("TWITCH_CHANNEL is not set");
        return;
    }
    if normalize_channel(&config.channel).is_none() {
        reporter.error(format!("invalid Twitch channel '{}'", config.channel));
        return;
    }

    let mut emitter = EventEmitter::new(Platform::Twitch, ctx.broadcaster.clone());

    loop {
        reporter.connecting(backoff.attempt());
        let error = match run_session(&config, &cancel, &mut emitter, &mut reporter, &mut backoff).await {
            SessionEnd::Cancelled => return,
            SessionEnd::Failed(e) => e,
        };

        if error.is_terminal() {
            reporter.error(error.to_string());
            return;
        }

        let delay = backoff.next_delay();
        tracing::warn!(
            channel = %config.channel,
            error = %error,
            attempt = backoff.attempt(),
            retry_in_ms = delay.as_millis() as u64,
            "Twitch chat session ended, reconnecting"
        );
        reporter.backoff(backoff.attempt(), delay, error.to_string());
        if sleep_or_cancel(&cancel, delay).await {
            return;
        }
    }
}

async fn run_session(
    config: &ChatConfig,
    cancel: &CancellationToken,
    emitter: &mut EventEmitter,
    reporter: &mut StatusReporter,
    backoff: &mut Backoff,
) -> SessionEnd {
    let connected = tokio::select! {
        biased;
        _ = cancel.cancelled() => return SessionEnd::Cancelled,
        result = ChatSession::connect(config) => result,
    };
    let mut session = match connected {
        Ok(session) => session,
        Err(e) => return SessionEnd::Failed(e),
    };

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            event = session.next_event() => Some(event),
        };
        let Some(event) = next else {
            session.close().await;
            return SessionEnd::Cancelled;
        };

        match event {
            Ok(SessionEvent::Joined(channel)) => {
                tracing::info!(channel = %channel, nick = %session.nick(), "Joined Twitch chat");
                backoff.reset();
                reporter.connected(format!("#{channel}"));
            }
            Ok(SessionEvent::Message(msg)) => {
                emitter.emit(UpstreamPayload::Twitch(msg));
            }
            Ok(SessionEvent::Notice(text)) => {
                tracing::debug!(channel = %session.channel(), notice = %text, "Twitch notice");
            }
            Err(e @ TwitchError::ReconnectRequested) => {
                tracing::info!(channel = %session.channel(), "Twitch requested reconnect");
                session.close().await;
                return SessionEnd::Failed(e);
            }
            Err(e) => return SessionEnd::Failed(e),
        }
    }
}

#[cfg(test)]
mod tests;
