//! Normalize, deduplicate and publish upstream messages for one connector.

use std::collections::{HashSet, VecDeque};

use crate::broadcaster::Broadcaster;
use crate::event::{ChatEvent, Platform};
use crate::normalize::{UpstreamPayload, normalize};

/// Ids remembered per connector instance.
const RECENT_ID_CAPACITY: usize = 4096;

/// Bounded set of recently seen event ids, oldest evicted first.
#[derive(Debug)]
pub struct RecentIds {
    set: HashSet<String>,
    order: VecDeque<String>,
    capacity: usize,
}

impl RecentIds {
    pub fn new(capacity: usize) -> Self {
        Self {
            set: HashSet::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    /// Record `id`. Returns `false` if it was already known.
    pub fn insert(&mut self, id: &str) -> bool {
        if self.set.contains(id) {
            return false;
        }
        if self.order.len() == self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.set.remove(&oldest);
            }
        }
        self.set.insert(id.to_string());
        self.order.push_back(id.to_string());
        true
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }
}

/// Publishes a connector's events in arrival order, at most once per id.
pub struct EventEmitter {
    platform: Platform,
    broadcaster: Broadcaster,
    seen: RecentIds,
}

impl EventEmitter {
    pub fn new(platform: Platform, broadcaster: Broadcaster) -> Self {
        Self {
            platform,
            broadcaster,
            seen: RecentIds::new(RECENT_ID_CAPACITY),
        }
    }

    /// Returns the published event, or `None` if it was malformed or a
    /// duplicate.
    pub fn emit(&mut self, payload: UpstreamPayload) -> Option<ChatEvent> {
        let event = match normalize(payload) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(platform = self.platform.as_str(), error = %e, "Dropping malformed chat payload");
                return None;
            }
        };
        if !self.seen.insert(&event.id) {
            tracing::debug!(platform = self.platform.as_str(), id = %event.id, "Skipping duplicate chat event");
            return None;
        }
        tracing::trace!(platform = self.platform.as_str(), user = %event.user, "Chat event");
        self.broadcaster.publish(&event);
        Some(event)
    }

    /// Remember an id without publishing it (history skipped on connect).
    pub fn mark_seen(&mut self, id: &str) {
        self.seen.insert(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcaster::{Outbound, TransportKind};
    use crate::status::StatusBoard;
    use chrono::Utc;
    use std::time::Duration;
    use twitch_client::{IrcMessage, Privmsg};

    fn payload(line: &str) -> UpstreamPayload {
        UpstreamPayload::Twitch(Privmsg::from_irc(IrcMessage::parse(line).unwrap(), Utc::now()).unwrap())
    }

    #[test]
    fn recent_ids_evict_oldest() {
        let mut ids = RecentIds::new(2);
        assert!(ids.insert("a"));
        assert!(!ids.insert("a"));
        assert!(ids.insert("b"));
        assert!(ids.insert("c"));
        assert_eq!(ids.len(), 2);
        assert!(ids.insert("a"));
        assert!(!ids.insert("c"));
    }

    #[tokio::test]
    async fn duplicates_and_malformed_payloads_are_not_published() {
        let broadcaster = Broadcaster::new(StatusBoard::new(), 16, Duration::from_secs(90));
        let mut reg = broadcaster.register_client(TransportKind::WebSocket);
        let mut emitter = EventEmitter::new(Platform::Twitch, broadcaster);

        assert!(emitter.emit(payload("@id=m1 :a!a@a PRIVMSG #c :first")).is_some());
        assert!(emitter.emit(payload("@id=m1 :a!a@a PRIVMSG #c :first")).is_none());
        assert!(emitter.emit(payload("@id=m2 :a!a@a PRIVMSG #c : ")).is_none());
        emitter.mark_seen("m3");
        assert!(emitter.emit(payload("@id=m3 :a!a@a PRIVMSG #c :old")).is_none());
        assert!(emitter.emit(payload("@id=m4 :a!a@a PRIVMSG #c :second")).is_some());

        let mut ids = Vec::new();
        while let Ok(Outbound::Frame(text)) = reg.receiver.try_recv() {
            let frame: serde_json::Value = serde_json::from_str(&text).unwrap();
            if frame["type"] == "twitch" {
                ids.push(frame["data"]["id"].as_str().unwrap().to_string());
            }
        }
        assert_eq!(ids, vec!["m1", "m4"]);
    }
}
