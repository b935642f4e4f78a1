//! Chat relay server binary.
//!
//! Starts the axum web server, the upstream connectors, the client heartbeat
//! and waits for Ctrl+C.

use tracing_subscriber::EnvFilter;

use chat_relay::app::SharedState;
use chat_relay::background;
use chat_relay::server;
use chat_relay::shutdown;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting chat relay");

    let (config, features, settings) = chat_relay::init_foundation()?;
    let state = SharedState::new(config, features, settings);

    let server_state = state.clone();
    let mut server_handle = tokio::spawn(async move { server::start_server(server_state).await });

    let s = state.clone();
    tokio::spawn(async move { background::client_heartbeat_loop(s).await });

    state.start_connectors();

    tracing::info!(
        port = state.server_port(),
        "Chat relay running. Press Ctrl+C to stop."
    );

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            tracing::info!("Shutting down...");
        }
        result = &mut server_handle => {
            // Server ended on its own (bind failure or fatal error).
            state.stop_connectors().await;
            return result?;
        }
    }

    shutdown::graceful_shutdown(&state).await;
    server_handle.await??;
    Ok(())
}
