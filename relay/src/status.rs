//! Connector status board shared between connectors, the broadcaster and the
//! HTTP handlers.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::event::Platform;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectorStatus {
    Disconnected,
    Connecting,
    Connected,
    Backoff,
    Error,
}

impl ConnectorStatus {
    /// Word used in client-facing system notices.
    pub fn label(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Backoff => "reconnecting",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorState {
    pub status: ConnectorStatus,
    pub reconnect_attempt: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_retry_at_utc: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl ConnectorState {
    pub fn new(status: ConnectorStatus) -> Self {
        Self {
            status,
            reconnect_attempt: 0,
            next_retry_at_utc: None,
            detail: None,
            updated_at: Utc::now(),
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn retrying(mut self, attempt: u32, next_retry_at: DateTime<Utc>) -> Self {
        self.reconnect_attempt = attempt;
        self.next_retry_at_utc = Some(next_retry_at);
        self
    }
}

/// Latest state per connector.
#[derive(Clone, Default)]
pub struct StatusBoard {
    inner: Arc<Mutex<BTreeMap<Platform, ConnectorState>>>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new state. Returns the status it replaced, if any.
    pub fn update(&self, platform: Platform, state: ConnectorState) -> Option<ConnectorStatus> {
        let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        map.insert(platform, state).map(|prev| prev.status)
    }

    pub fn get(&self, platform: Platform) -> Option<ConnectorState> {
        let map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        map.get(&platform).cloned()
    }

    pub fn snapshot(&self) -> BTreeMap<Platform, ConnectorState> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
