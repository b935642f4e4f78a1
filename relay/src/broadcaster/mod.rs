//! Fan-out of chat events to connected overlay clients.
//!
//! Every client owns a bounded FIFO queue drained by its transport task
//! (WebSocket or SSE). `publish` serializes an event once and enqueues it to
//! every client without waiting. A client whose queue is closed or full is
//! dropped from the registry; the others never notice.

#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::event::{ChatEvent, welcome_frame};
use crate::status::StatusBoard;

/// Item queued for a client's transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Serialized JSON frame, shared between all recipients.
    Frame(Arc<str>),
    /// Transport-level keepalive.
    Ping,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    #[serde(rename = "ws")]
    WebSocket,
    Sse,
}

struct ClientEntry {
    tx: mpsc::Sender<Outbound>,
    kind: TransportKind,
    connected_at: DateTime<Utc>,
    last_activity: DateTime<Utc>,
}

/// Public view of a registered client.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientInfo {
    pub id: String,
    pub kind: TransportKind,
    pub connected_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

/// Result of one heartbeat sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeartbeatReport {
    pub pinged: usize,
    pub pruned: usize,
}

/// What a transport gets back from [`Broadcaster::register_client`].
///
/// The welcome frame is already waiting in `receiver`. Dropping `guard`
/// unregisters the client.
pub struct ClientRegistration {
    pub id: String,
    pub receiver: mpsc::Receiver<Outbound>,
    pub guard: ClientGuard,
}

/// Unregisters its client when dropped.
pub struct ClientGuard {
    id: String,
    broadcaster: Broadcaster,
}

impl ClientGuard {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Refresh the client's last-activity timestamp.
    pub fn touch(&self) {
        self.broadcaster.touch(&self.id);
    }
}

impl Drop for ClientGuard {
    fn drop(&mut self) {
        self.broadcaster.unregister_client(&self.id);
    }
}

struct BroadcasterInner {
    clients: Mutex<HashMap<String, ClientEntry>>,
    status: StatusBoard,
    queue_size: usize,
    idle_timeout: Duration,
}

#[derive(Clone)]
pub struct Broadcaster {
    inner: Arc<BroadcasterInner>,
}

impl Broadcaster {
    pub fn new(status: StatusBoard, queue_size: usize, idle_timeout: Duration) -> Self {
        Self {
            inner: Arc::new(BroadcasterInner {
                clients: Mutex::new(HashMap::new()),
                status,
                queue_size: queue_size.max(1),
                idle_timeout,
            }),
        }
    }

    fn clients(&self) -> MutexGuard<'_, HashMap<String, ClientEntry>> {
        self.inner
            .clients
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a client. Its welcome frame is queued before it becomes visible to
    /// `publish`, so it is always the first frame the client sees.
    pub fn register_client(&self, kind: TransportKind) -> ClientRegistration {
        let id = uuid::Uuid::new_v4().to_string();
        let (tx, receiver) = mpsc::channel(self.inner.queue_size);

        let welcome = welcome_frame(&id, &self.inner.status.snapshot());
        // Fresh queue with capacity >= 1, cannot fail.
        let _ = tx.try_send(Outbound::Frame(Arc::from(welcome.to_string())));

        let now = Utc::now();
        let count = {
            let mut clients = self.clients();
            clients.insert(
                id.clone(),
                ClientEntry {
                    tx,
                    kind,
                    connected_at: now,
                    last_activity: now,
                },
            );
            clients.len()
        };
        tracing::info!(client_id = %id, kind = ?kind, clients = count, "Overlay client connected");

        ClientRegistration {
            guard: ClientGuard {
                id: id.clone(),
                broadcaster: self.clone(),
            },
            id,
            receiver,
        }
    }

    /// Remove a client. Unknown ids are ignored.
    pub fn unregister_client(&self, id: &str) {
        let removed = {
            let mut clients = self.clients();
            clients.remove(id).map(|entry| (entry, clients.len()))
        };
        if let Some((entry, remaining)) = removed {
            let connected_for = (Utc::now() - entry.connected_at).num_seconds();
            tracing::info!(
                client_id = %id,
                kind = ?entry.kind,
                connected_for,
                clients = remaining,
                "Overlay client disconnected"
            );
        }
    }

    /// Queue `event` for every client. Returns how many clients accepted it.
    pub fn publish(&self, event: &ChatEvent) -> usize {
        let frame: Arc<str> = Arc::from(event.to_frame().to_string());
        let (delivered, dropped) = {
            let mut clients = self.clients();
            let before = clients.len();
            clients.retain(|id, entry| match entry.tx.try_send(Outbound::Frame(frame.clone())) {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!(client_id = %id, error = %e, "Dropping overlay client");
                    false
                }
            });
            (clients.len(), before - clients.len())
        };
        tracing::debug!(
            event_id = %event.id,
            platform = event.platform.as_str(),
            delivered,
            dropped,
            "Event published"
        );
        delivered
    }

    /// Queue a frame for one client only. Returns `false` if it is gone.
    pub fn send_to_client(&self, id: &str, frame: &Value) -> bool {
        let mut clients = self.clients();
        let Some(entry) = clients.get(id) else {
            return false;
        };
        if entry
            .tx
            .try_send(Outbound::Frame(Arc::from(frame.to_string())))
            .is_ok()
        {
            return true;
        }
        clients.remove(id);
        false
    }

    /// Ping every client and prune the ones idle longer than the timeout.
    pub fn heartbeat(&self, now: DateTime<Utc>) -> HeartbeatReport {
        let idle_timeout = chrono::Duration::from_std(self.inner.idle_timeout)
            .unwrap_or_else(|_| chrono::Duration::MAX);
        let mut report = HeartbeatReport::default();
        let mut clients = self.clients();
        clients.retain(|id, entry| {
            if now - entry.last_activity > idle_timeout {
                tracing::info!(client_id = %id, "Pruning idle overlay client");
                report.pruned += 1;
                return false;
            }
            if entry.tx.try_send(Outbound::Ping).is_err() {
                tracing::debug!(client_id = %id, "Heartbeat failed, dropping overlay client");
                report.pruned += 1;
                return false;
            }
            report.pinged += 1;
            true
        });
        report
    }

    /// Refresh a client's last-activity timestamp.
    pub fn touch(&self, id: &str) {
        if let Some(entry) = self.clients().get_mut(id) {
            entry.last_activity = Utc::now();
        }
    }

    pub fn client_count(&self) -> usize {
        self.clients().len()
    }

    pub fn client_infos(&self) -> Vec<ClientInfo> {
        let mut infos: Vec<ClientInfo> = self
            .clients()
            .iter()
            .map(|(id, entry)| ClientInfo {
                id: id.clone(),
                kind: entry.kind,
                connected_at: entry.connected_at,
                last_activity: entry.last_activity,
            })
            .collect();
        infos.sort_by_key(|c| c.connected_at);
        infos
    }
}
