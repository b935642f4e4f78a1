//! Upstream chat connectors and their supervisors.
//!
//! A [`ConnectorHandle`] owns one supervisor task. The task runs until its
//! cancellation token fires or it hits a terminal configuration error.

pub mod backoff;
pub mod emitter;
pub mod twitch;
pub mod youtube;

#[cfg(test)]
mod tests;

use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use futures::future::BoxFuture;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::broadcaster::Broadcaster;
use crate::event::{ChatEvent, Platform};
use crate::status::{ConnectorState, ConnectorStatus, StatusBoard};

pub use backoff::Backoff;
pub use emitter::EventEmitter;

type RunFn = Arc<dyn Fn(CancellationToken) -> BoxFuture<'static, ()> + Send + Sync>;

struct Running {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Start/stop control over one connector's supervisor task.
pub struct ConnectorHandle {
    platform: Platform,
    status: StatusBoard,
    run: RunFn,
    running: Mutex<Option<Running>>,
}

impl ConnectorHandle {
    pub fn new<F>(platform: Platform, status: StatusBoard, run: F) -> Self
    where
        F: Fn(CancellationToken) -> BoxFuture<'static, ()> + Send + Sync + 'static,
    {
        status.update(platform, ConnectorState::new(ConnectorStatus::Disconnected));
        Self {
            platform,
            status,
            run: Arc::new(run),
            running: Mutex::new(None),
        }
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Spawn the supervisor. No-op while a previous one is still running.
    /// Returns whether a new task was spawned.
    pub fn start(&self) -> bool {
        let mut running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        if running.as_ref().is_some_and(|r| !r.task.is_finished()) {
            return false;
        }
        let cancel = CancellationToken::new();
        let task = tokio::spawn((self.run)(cancel.clone()));
        *running = Some(Running { cancel, task });
        tracing::info!(platform = self.platform.as_str(), "Connector started");
        true
    }

    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|r| !r.task.is_finished())
    }

    /// Cancel the supervisor and wait for it to finish. Safe to call again.
    pub async fn stop(&self) {
        let running = self
            .running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(Running { cancel, task }) = running else {
            return;
        };
        cancel.cancel();
        if let Err(e) = task.await {
            tracing::error!(platform = self.platform.as_str(), error = %e, "Connector task failed");
        }
        // A configuration error outlives the task that reported it.
        let failed = self
            .status
            .get(self.platform)
            .is_some_and(|s| s.status == ConnectorStatus::Error);
        if !failed {
            self.status.update(
                self.platform,
                ConnectorState::new(ConnectorStatus::Disconnected).with_detail("stopped"),
            );
        }
        tracing::info!(platform = self.platform.as_str(), "Connector stopped");
    }
}

/// Shared handles a connector task needs.
#[derive(Clone)]
pub struct ConnectorContext {
    pub broadcaster: Broadcaster,
    pub status: StatusBoard,
}

/// Writes a connector's state to the status board and tells clients about
/// transitions they care about.
pub struct StatusReporter {
    platform: Platform,
    ctx: ConnectorContext,
    last_notified: Option<ConnectorStatus>,
}

impl StatusReporter {
    pub fn new(platform: Platform, ctx: ConnectorContext) -> Self {
        Self {
            platform,
            ctx,
            last_notified: None,
        }
    }

    pub fn set(&mut self, state: ConnectorState) {
        let status = state.status;
        let detail = state.detail.clone();
        self.ctx.status.update(self.platform, state);

        // `connecting` flips back and forth with `backoff` on every retry.
        if status == ConnectorStatus::Connecting || self.last_notified == Some(status) {
            return;
        }
        if self.last_notified.is_none() && status == ConnectorStatus::Disconnected {
            self.last_notified = Some(status);
            return;
        }
        self.last_notified = Some(status);

        let text = match (status, detail) {
            (ConnectorStatus::Error, Some(detail)) => {
                format!("{}: error ({detail})", self.platform.label())
            }
            _ => format!("{}: {}", self.platform.label(), status.label()),
        };
        self.ctx.broadcaster.publish(&ChatEvent::system(text));
    }

    pub fn connecting(&mut self, attempt: u32) {
        let mut state = ConnectorState::new(ConnectorStatus::Connecting);
        state.reconnect_attempt = attempt;
        self.set(state);
    }

    pub fn connected(&mut self, detail: impl Into<String>) {
        self.set(ConnectorState::new(ConnectorStatus::Connected).with_detail(detail));
    }

    pub fn disconnected(&mut self, detail: impl Into<String>) {
        self.set(ConnectorState::new(ConnectorStatus::Disconnected).with_detail(detail));
    }

    pub fn backoff(&mut self, attempt: u32, delay: std::time::Duration, detail: impl Into<String>) {
        let next = Utc::now() + chrono::Duration::from_std(delay).unwrap_or_default();
        self.set(
            ConnectorState::new(ConnectorStatus::Backoff)
                .retrying(attempt, next)
                .with_detail(detail),
        );
    }

    /// Terminal: the supervisor returns right after this.
    pub fn error(&mut self, detail: impl Into<String>) {
        let detail = detail.into();
        tracing::error!(platform = self.platform.as_str(), %detail, "Connector stopped on configuration error");
        self.set(ConnectorState::new(ConnectorStatus::Error).with_detail(detail));
    }
}
