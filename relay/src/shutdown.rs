use crate::app::SharedState;

/// Stop connectors first so no event is published into a closing server,
/// then cancel the server and background loops.
pub async fn graceful_shutdown(state: &SharedState) {
    tracing::info!("Shutdown sequence started");

    state.stop_connectors().await;
    tracing::info!("Shutdown: connectors stopped");

    state.shutdown_token().cancel();
    tracing::info!("Shutdown: server and background loops cancelled");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AppConfig, FeatureStatus};
    use crate::status::ConnectorStatus;
    use crate::event::Platform;

    #[tokio::test]
    async fn shutdown_stops_connectors_and_cancels_token() {
        // No channel or key configured: both connectors end in `error` at once.
        let state = SharedState::new(AppConfig::default(), FeatureStatus::default(), Vec::new());
        state.start_connectors();
        graceful_shutdown(&state).await;

        assert!(state.shutdown_token().is_cancelled());
        assert!(state.connectors().iter().all(|c| !c.is_running()));
        // Stopping keeps the configuration error visible.
        let twitch = state.status().get(Platform::Twitch).unwrap();
        assert_eq!(twitch.status, ConnectorStatus::Error);
        assert_eq!(twitch.detail.as_deref(), Some("TWITCH_CHANNEL is not set"));
    }
}
