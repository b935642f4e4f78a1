use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures::FutureExt;
use serde_json::Value;

use super::*;
use crate::background::sleep_or_cancel;
use crate::broadcaster::{ClientRegistration, Outbound, TransportKind};

fn context() -> ConnectorContext {
    let status = StatusBoard::new();
    ConnectorContext {
        broadcaster: Broadcaster::new(status.clone(), 1024, Duration::from_secs(90)),
        status,
    }
}

fn drain_frames(reg: &mut ClientRegistration) -> Vec<Value> {
    let mut frames = Vec::new();
    while let Ok(item) = reg.receiver.try_recv() {
        if let Outbound::Frame(text) = item {
            frames.push(serde_json::from_str(&text).unwrap());
        }
    }
    frames
}

/// Connector that publishes a numbered system event every 100ms.
fn ticking_handle(ctx: &ConnectorContext, spawned: Arc<AtomicUsize>) -> ConnectorHandle {
    let broadcaster = ctx.broadcaster.clone();
    ConnectorHandle::new(Platform::Twitch, ctx.status.clone(), move |cancel| {
        let broadcaster = broadcaster.clone();
        spawned.fetch_add(1, Ordering::SeqCst);
        async move {
            let mut n = 0u32;
            loop {
                broadcaster.publish(&ChatEvent::system(format!("tick {n}")));
                n += 1;
                if sleep_or_cancel(&cancel, Duration::from_millis(100)).await {
                    return;
                }
            }
        }
        .boxed()
    })
}

#[tokio::test(start_paused = true)]
async fn start_is_idempotent_while_running() {
    let ctx = context();
    let spawned = Arc::new(AtomicUsize::new(0));
    let handle = ticking_handle(&ctx, spawned.clone());

    assert!(handle.start());
    assert!(!handle.start());
    assert!(handle.is_running());
    assert_eq!(spawned.load(Ordering::SeqCst), 1);

    handle.stop().await;
    assert!(!handle.is_running());
    assert!(handle.start());
    assert_eq!(spawned.load(Ordering::SeqCst), 2);
    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn no_events_after_stop_resolves() {
    let ctx = context();
    let mut client = ctx.broadcaster.register_client(TransportKind::WebSocket);
    let handle = ticking_handle(&ctx, Arc::new(AtomicUsize::new(0)));

    handle.start();
    tokio::time::sleep(Duration::from_millis(550)).await;
    handle.stop().await;
    let before = drain_frames(&mut client);
    assert!(before.len() >= 5);

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(drain_frames(&mut client).is_empty());

    let state = ctx.status.get(Platform::Twitch).unwrap();
    assert_eq!(state.status, ConnectorStatus::Disconnected);
    // Repeated stop is harmless.
    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn events_keep_connector_order() {
    let ctx = context();
    let mut client = ctx.broadcaster.register_client(TransportKind::Sse);
    let handle = ticking_handle(&ctx, Arc::new(AtomicUsize::new(0)));

    handle.start();
    tokio::time::sleep(Duration::from_millis(1050)).await;
    handle.stop().await;

    let ticks: Vec<String> = drain_frames(&mut client)
        .into_iter()
        .filter(|f| f["type"] == "system")
        .map(|f| f["data"]["message"].as_str().unwrap().to_string())
        .collect();
    let expected: Vec<String> = (0..ticks.len()).map(|n| format!("tick {n}")).collect();
    assert!(ticks.len() >= 10);
    assert_eq!(ticks, expected);
}

#[tokio::test]
async fn stop_keeps_a_terminal_error() {
    let ctx = context();
    let reporter_ctx = ctx.clone();
    let handle = ConnectorHandle::new(Platform::Youtube, ctx.status.clone(), move |_cancel| {
        let ctx = reporter_ctx.clone();
        async move {
            StatusReporter::new(Platform::Youtube, ctx).error("YOUTUBE_API_KEY is not set");
        }
        .boxed()
    });

    handle.start();
    tokio::task::yield_now().await;
    handle.stop().await;

    let state = ctx.status.get(Platform::Youtube).unwrap();
    assert_eq!(state.status, ConnectorStatus::Error);
    assert_eq!(state.detail.as_deref(), Some("YOUTUBE_API_KEY is not set"));
}

#[test]
fn reporter_notifies_on_transitions_only() {
    let ctx = context();
    let mut client = ctx.broadcaster.register_client(TransportKind::WebSocket);
    let mut reporter = StatusReporter::new(Platform::Youtube, ctx.clone());

    reporter.disconnected("no live broadcast");
    reporter.connecting(0);
    reporter.connected("video abc");
    reporter.connected("video abc");
    reporter.backoff(1, Duration::from_secs(2), "timeout");
    reporter.connecting(1);
    reporter.backoff(2, Duration::from_secs(4), "timeout");
    reporter.connected("video abc");
    reporter.error("keyInvalid");

    let notices: Vec<String> = drain_frames(&mut client)
        .into_iter()
        .filter(|f| f["type"] == "system")
        .map(|f| f["data"]["message"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(
        notices,
        vec![
            "YouTube: connected",
            "YouTube: reconnecting",
            "YouTube: connected",
            "YouTube: error (keyInvalid)",
        ]
    );

    let state = ctx.status.get(Platform::Youtube).unwrap();
    assert_eq!(state.status, ConnectorStatus::Error);
}

#[test]
fn backoff_state_records_retry_schedule() {
    let ctx = context();
    let mut reporter = StatusReporter::new(Platform::Twitch, ctx.clone());
    reporter.backoff(3, Duration::from_secs(8), "closed");
    let state = ctx.status.get(Platform::Twitch).unwrap();
    assert_eq!(state.status, ConnectorStatus::Backoff);
    assert_eq!(state.reconnect_attempt, 3);
    assert!(state.next_retry_at_utc.unwrap() > state.updated_at);
}
