//! Background task loops and the cancellable sleep they share.

use std::time::Duration;

use chrono::Utc;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::app::SharedState;

/// Sleep for `duration`. Returns `true` if the token fired first.
pub(crate) async fn sleep_or_cancel(token: &CancellationToken, duration: Duration) -> bool {
    tokio::select! {
        biased;
        _ = token.cancelled() => true,
        _ = sleep(duration) => false,
    }
}

/// Periodic keepalive to overlay clients; prunes idle ones.
pub async fn client_heartbeat_loop(state: SharedState) {
    let shutdown_token = state.shutdown_token().clone();
    let interval = state.config().client_heartbeat;

    loop {
        if sleep_or_cancel(&shutdown_token, interval).await {
            tracing::info!("Client heartbeat loop stopped (shutdown)");
            return;
        }

        let report = state.broadcaster().heartbeat(Utc::now());
        if report.pruned > 0 {
            tracing::info!(
                pinged = report.pinged,
                pruned = report.pruned,
                "Client heartbeat pruned idle clients"
            );
        } else {
            tracing::trace!(pinged = report.pinged, "Client heartbeat");
        }
    }
}
