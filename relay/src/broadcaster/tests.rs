use super::*;
use crate::event::Platform;
use crate::status::{ConnectorState, ConnectorStatus};

fn broadcaster(queue_size: usize) -> Broadcaster {
    Broadcaster::new(StatusBoard::new(), queue_size, Duration::from_secs(90))
}

fn frame_json(item: Outbound) -> Value {
    match item {
        Outbound::Frame(text) => serde_json::from_str(&text).unwrap(),
        Outbound::Ping => panic!("expected a frame, got a ping"),
    }
}

fn chat(id: &str) -> ChatEvent {
    ChatEvent {
        id: id.into(),
        platform: Platform::Twitch,
        user: "Foo".into(),
        message: format!("message {id}"),
        timestamp_utc: Utc::now(),
        badges: Default::default(),
        color: None,
    }
}

#[tokio::test]
async fn welcome_is_the_first_frame() {
    let status = StatusBoard::new();
    status.update(Platform::Twitch, ConnectorState::new(ConnectorStatus::Connected));
    let b = Broadcaster::new(status, 16, Duration::from_secs(90));

    let mut reg = b.register_client(TransportKind::WebSocket);
    b.publish(&chat("1"));

    let welcome = frame_json(reg.receiver.recv().await.unwrap());
    assert_eq!(welcome["type"], "welcome");
    assert_eq!(welcome["data"]["clientId"], reg.id.as_str());
    assert_eq!(welcome["data"]["connectors"]["twitch"]["status"], "connected");

    let first = frame_json(reg.receiver.recv().await.unwrap());
    assert_eq!(first["data"]["id"], "1");
}

#[tokio::test]
async fn events_arrive_in_publish_order() {
    let b = broadcaster(64);
    let mut reg = b.register_client(TransportKind::Sse);
    for i in 0..10 {
        assert_eq!(b.publish(&chat(&i.to_string())), 1);
    }
    let _welcome = reg.receiver.recv().await.unwrap();
    for i in 0..10 {
        let frame = frame_json(reg.receiver.recv().await.unwrap());
        assert_eq!(frame["data"]["id"], i.to_string());
    }
}

#[tokio::test]
async fn dead_client_is_removed_without_affecting_others() {
    let b = broadcaster(16);
    let mut alive_a = b.register_client(TransportKind::WebSocket);
    let dead = b.register_client(TransportKind::WebSocket);
    let mut alive_b = b.register_client(TransportKind::Sse);
    assert_eq!(b.client_count(), 3);

    // Transport went away but the registry has not heard about it yet.
    let ClientRegistration {
        receiver, guard, ..
    } = dead;
    drop(receiver);
    std::mem::forget(guard);

    assert_eq!(b.publish(&chat("x")), 2);
    assert_eq!(b.client_count(), 2);

    for reg in [&mut alive_a, &mut alive_b] {
        let _welcome = reg.receiver.recv().await.unwrap();
        let frame = frame_json(reg.receiver.recv().await.unwrap());
        assert_eq!(frame["data"]["id"], "x");
    }
}

#[tokio::test]
async fn full_queue_drops_only_the_slow_client() {
    let b = broadcaster(2);
    let slow = b.register_client(TransportKind::WebSocket);
    let mut fast = b.register_client(TransportKind::WebSocket);

    // Welcome already occupies one slot in each queue.
    let _ = fast.receiver.recv().await;
    assert_eq!(b.publish(&chat("1")), 2);
    let _ = fast.receiver.recv().await;
    assert_eq!(b.publish(&chat("2")), 1);
    assert_eq!(b.client_count(), 1);
    assert_eq!(b.client_infos()[0].id, fast.id);
    drop(slow);
}

#[tokio::test]
async fn dropping_the_guard_unregisters() {
    let b = broadcaster(8);
    let reg = b.register_client(TransportKind::WebSocket);
    assert_eq!(b.client_count(), 1);
    drop(reg);
    assert_eq!(b.client_count(), 0);
    b.unregister_client("unknown");
}

#[tokio::test]
async fn send_to_client_targets_one_client() {
    let b = broadcaster(8);
    let mut a = b.register_client(TransportKind::WebSocket);
    let mut other = b.register_client(TransportKind::WebSocket);
    assert!(b.send_to_client(&a.id, &serde_json::json!({ "type": "pong" })));
    assert!(!b.send_to_client("missing", &serde_json::json!({})));

    let _ = a.receiver.recv().await;
    assert_eq!(frame_json(a.receiver.recv().await.unwrap())["type"], "pong");
    let _ = other.receiver.recv().await;
    assert!(other.receiver.try_recv().is_err());
}

#[tokio::test]
async fn heartbeat_pings_and_prunes_idle_clients() {
    let b = broadcaster(8);
    let mut reg = b.register_client(TransportKind::Sse);
    let _ = reg.receiver.recv().await;

    let report = b.heartbeat(Utc::now());
    assert_eq!(report, HeartbeatReport { pinged: 1, pruned: 0 });
    assert_eq!(reg.receiver.recv().await, Some(Outbound::Ping));

    reg.guard.touch();
    let later = Utc::now() + chrono::Duration::seconds(120);
    let report = b.heartbeat(later);
    assert_eq!(report, HeartbeatReport { pinged: 0, pruned: 1 });
    assert_eq!(b.client_count(), 0);
    // Queue closed once the registry dropped its sender.
    assert_eq!(reg.receiver.recv().await, None);
}
