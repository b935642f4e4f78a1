use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use twitch_client::ChatConfig;
use youtube_client::{QuotaGovernor, YouTubeApiClient};

use crate::broadcaster::Broadcaster;
use crate::config::{AppConfig, FeatureStatus, SettingInfo};
use crate::connectors::youtube::YouTubeSettings;
use crate::connectors::{Backoff, ConnectorContext, ConnectorHandle, twitch, youtube};
use crate::event::Platform;
use crate::status::StatusBoard;

/// Application state shared by the HTTP handlers and background tasks.
#[derive(Clone)]
pub struct SharedState {
    inner: Arc<SharedStateInner>,
}

struct SharedStateInner {
    config: AppConfig,
    feature_status: FeatureStatus,
    settings: Vec<SettingInfo>,
    broadcaster: Broadcaster,
    status: StatusBoard,
    quota: QuotaGovernor,
    connectors: Vec<ConnectorHandle>,
    /// Cancelled once on shutdown; stops the server and background loops.
    shutdown_token: CancellationToken,
    started_at: DateTime<Utc>,
}

impl SharedState {
    /// Build the shared components and connector handles. Nothing is
    /// started yet.
    pub fn new(config: AppConfig, feature_status: FeatureStatus, settings: Vec<SettingInfo>) -> Self {
        let status = StatusBoard::new();
        let broadcaster = Broadcaster::new(
            status.clone(),
            config.client_queue_size,
            config.client_idle_timeout,
        );
        let quota = QuotaGovernor::new(config.youtube_daily_quota, Utc::now());
        let ctx = ConnectorContext {
            broadcaster: broadcaster.clone(),
            status: status.clone(),
        };
        let connectors = vec![
            twitch_connector(&config, ctx.clone()),
            youtube_connector(&config, ctx, quota.clone()),
        ];

        Self {
            inner: Arc::new(SharedStateInner {
                config,
                feature_status,
                settings,
                broadcaster,
                status,
                quota,
                connectors,
                shutdown_token: CancellationToken::new(),
                started_at: Utc::now(),
            }),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    pub fn server_port(&self) -> u16 {
        self.inner.config.server_port
    }

    pub fn feature_status(&self) -> &FeatureStatus {
        &self.inner.feature_status
    }

    /// Start-up settings with secrets masked.
    pub fn settings(&self) -> &[SettingInfo] {
        &self.inner.settings
    }

    pub fn broadcaster(&self) -> &Broadcaster {
        &self.inner.broadcaster
    }

    pub fn status(&self) -> &StatusBoard {
        &self.inner.status
    }

    pub fn quota(&self) -> &QuotaGovernor {
        &self.inner.quota
    }

    pub fn connectors(&self) -> &[ConnectorHandle] {
        &self.inner.connectors
    }

    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.inner.shutdown_token
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.inner.started_at
    }

    pub fn start_connectors(&self) {
        for connector in self.connectors() {
            connector.start();
        }
    }

    /// Stop every connector and wait for their tasks.
    pub async fn stop_connectors(&self) {
        futures::future::join_all(self.connectors().iter().map(ConnectorHandle::stop)).await;
    }
}

fn reconnect_backoff(config: &AppConfig) -> Backoff {
    Backoff::new(
        config.reconnect_base,
        config.reconnect_max,
        config.reconnect_jitter,
    )
}

fn twitch_connector(config: &AppConfig, ctx: ConnectorContext) -> ConnectorHandle {
    let chat_config = ChatConfig::anonymous(config.twitch_channel.clone());
    let backoff = reconnect_backoff(config);
    let status = ctx.status.clone();
    ConnectorHandle::new(Platform::Twitch, status, move |cancel| {
        twitch::run(ctx.clone(), chat_config.clone(), backoff.clone(), cancel).boxed()
    })
}

fn youtube_connector(config: &AppConfig, ctx: ConnectorContext, quota: QuotaGovernor) -> ConnectorHandle {
    let api_key = config.youtube_api_key.clone();
    let timeout = config.http_timeout;
    let settings = YouTubeSettings {
        channel_id: config.youtube_channel_id.clone(),
        live_id: Some(config.youtube_live_id.clone()).filter(|id| !id.is_empty()),
        offline_check: config.youtube_offline_check,
        skip_backlog: config.youtube_skip_backlog,
    };
    let backoff = reconnect_backoff(config);
    let status = ctx.status.clone();
    ConnectorHandle::new(Platform::Youtube, status, move |cancel| {
        let api = YouTubeApiClient::new(api_key.clone(), timeout);
        youtube::run(
            ctx.clone(),
            api,
            settings.clone(),
            quota.clone(),
            backoff.clone(),
            cancel,
        )
        .boxed()
    })
}
