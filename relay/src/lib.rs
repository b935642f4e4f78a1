//! Chat relay: aggregates Twitch and YouTube live chat and pushes it to
//! browser overlays over WebSocket or Server-Sent Events.

pub mod app;
pub mod background;
pub mod broadcaster;
pub mod config;
pub mod connectors;
pub mod event;
pub mod normalize;
pub mod server;
pub mod shutdown;
pub mod status;

use config::{AppConfig, FeatureStatus, SettingInfo, SettingsManager};

/// Load .env from multiple candidate paths.
fn load_dotenv() {
    let candidates = [".env", "../.env"];
    for path in &candidates {
        if dotenvy::from_filename(path).is_ok() {
            tracing::info!("Loaded .env from: {path}");
            return;
        }
    }
    tracing::info!("No .env file found, using system environment variables");
}

/// Load .env and the environment, then build the runtime config, the
/// feature status and the masked settings listing.
pub fn init_foundation() -> Result<(AppConfig, FeatureStatus, Vec<SettingInfo>), anyhow::Error> {
    load_dotenv();

    let sm = SettingsManager::from_env();
    let config = AppConfig::load(&sm)?;

    let status = sm.check_feature_status();
    if !status.missing_settings.is_empty() || !status.warnings.is_empty() {
        tracing::warn!(
            "Missing settings: {:?}, warnings: {:?}",
            status.missing_settings,
            status.warnings
        );
    }

    tracing::info!(
        port = config.server_port,
        twitch = status.twitch_configured,
        youtube = status.youtube_configured,
        "Settings loaded"
    );
    Ok((config, status, sm.get_all_settings()))
}
