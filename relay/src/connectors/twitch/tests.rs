use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::{FutureExt, SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{WebSocketStream, accept_async};

use super::*;
use crate::broadcaster::{Broadcaster, ClientRegistration, Outbound, TransportKind};
use crate::connectors::ConnectorHandle;
use crate::status::{ConnectorState, ConnectorStatus, StatusBoard};

const NICK: &str = "justinfan12345";

/// What the gateway does after a client has sent its JOIN.
enum Step {
    Send(String),
    Close,
    /// Keep the socket open until the client goes away.
    Hold,
    /// Send a numbered PRIVMSG every 20ms until the client goes away.
    Stream,
}

fn joined() -> Step {
    Step::Send(format!(":{NICK}!{NICK}@{NICK}.tmi.twitch.tv JOIN #streamer"))
}

fn privmsg(id: &str) -> String {
    format!(
        "@id={id};tmi-sent-ts=1700000000000 :viewer!viewer@viewer.tmi.twitch.tv PRIVMSG #streamer :hello {id}"
    )
}

/// Local chat gateway playing one script per accepted connection.
struct Gateway {
    url: String,
    /// Connector state at the moment each connection was accepted.
    accepted: Arc<Mutex<Vec<Option<ConnectorState>>>>,
}

async fn gateway(status: StatusBoard, sessions: Vec<Vec<Step>>) -> Gateway {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    let accepted = Arc::new(Mutex::new(Vec::new()));
    let log = accepted.clone();
    tokio::spawn(async move {
        let mut sessions = VecDeque::from(sessions);
        while let Ok((stream, _)) = listener.accept().await {
            log.lock().unwrap().push(status.get(Platform::Twitch));
            let steps = sessions.pop_front().unwrap_or_else(|| vec![Step::Hold]);
            tokio::spawn(serve(stream, steps));
        }
    });
    Gateway { url, accepted }
}

async fn serve(stream: TcpStream, steps: Vec<Step>) {
    let Ok(mut ws) = accept_async(stream).await else {
        return;
    };
    // CAP and NICK come first; answer once the JOIN is in.
    while let Some(Ok(msg)) = ws.next().await {
        if matches!(&msg, Message::Text(text) if text.as_str().starts_with("JOIN ")) {
            break;
        }
    }
    for step in steps {
        match step {
            Step::Send(line) => {
                if ws.send(Message::Text(line.into())).await.is_err() {
                    return;
                }
            }
            Step::Close => {
                let _ = ws.close(None).await;
                return;
            }
            Step::Hold => {
                while let Some(Ok(_)) = ws.next().await {}
                return;
            }
            Step::Stream => {
                stream_messages(&mut ws).await;
                return;
            }
        }
    }
}

async fn stream_messages(ws: &mut WebSocketStream<TcpStream>) {
    let mut n = 0u32;
    loop {
        tokio::select! {
            msg = ws.next() => match msg {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => return,
                Some(Ok(_)) => {}
            },
            _ = tokio::time::sleep(Duration::from_millis(20)) => {
                n += 1;
                let line = privmsg(&format!("s{n}"));
                if ws.send(Message::Text(line.into())).await.is_err() {
                    return;
                }
            }
        }
    }
}

fn context() -> (ConnectorContext, ClientRegistration) {
    let status = StatusBoard::new();
    let broadcaster = Broadcaster::new(status.clone(), 1024, Duration::from_secs(90));
    let client = broadcaster.register_client(TransportKind::WebSocket);
    (
        ConnectorContext {
            broadcaster,
            status,
        },
        client,
    )
}

fn chat_config(url: &str) -> ChatConfig {
    ChatConfig {
        url: url.to_string(),
        channel: "streamer".into(),
        nick: Some(NICK.into()),
    }
}

fn fast_backoff() -> Backoff {
    Backoff::new(Duration::from_millis(10), Duration::from_millis(100), Duration::ZERO)
}

#[derive(Default)]
struct Seen {
    chat_ids: Vec<String>,
    notices: Vec<String>,
}

fn drain(client: &mut ClientRegistration, seen: &mut Seen) {
    while let Ok(item) = client.receiver.try_recv() {
        let Outbound::Frame(text) = item else { continue };
        let frame: Value = serde_json::from_str(&text).unwrap();
        let data = &frame["data"];
        match frame["type"].as_str() {
            Some("twitch") => seen.chat_ids.push(data["id"].as_str().unwrap().to_string()),
            Some("system") => seen.notices.push(data["message"].as_str().unwrap().to_string()),
            _ => {}
        }
    }
}

async fn wait_until(client: &mut ClientRegistration, seen: &mut Seen, done: impl Fn(&Seen) -> bool) {
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            drain(client, seen);
            if done(seen) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("timed out waiting for relayed frames");
}

#[tokio::test]
async fn reconnects_after_server_close_and_reconnect_request() {
    let (ctx, mut client) = context();
    let gw = gateway(
        ctx.status.clone(),
        vec![
            vec![joined(), Step::Send(privmsg("m1")), Step::Close],
            vec![
                joined(),
                Step::Send(privmsg("m1")),
                Step::Send(privmsg("m2")),
                Step::Send(":tmi.twitch.tv RECONNECT".into()),
                Step::Hold,
            ],
            vec![joined(), Step::Send(privmsg("m3")), Step::Hold],
        ],
    )
    .await;
    let cancel = CancellationToken::new();
    let task = tokio::spawn(run(ctx.clone(), chat_config(&gw.url), fast_backoff(), cancel.clone()));

    let mut seen = Seen::default();
    wait_until(&mut client, &mut seen, |s| s.chat_ids.len() >= 3 && s.notices.len() >= 5).await;

    // "m1" is replayed by the second session and published once.
    assert_eq!(seen.chat_ids, vec!["m1", "m2", "m3"]);
    assert_eq!(
        seen.notices,
        vec![
            "Twitch: connected",
            "Twitch: reconnecting",
            "Twitch: connected",
            "Twitch: reconnecting",
            "Twitch: connected",
        ]
    );
    let state = ctx.status.get(Platform::Twitch).unwrap();
    assert_eq!(state.status, ConnectorStatus::Connected);
    assert_eq!(state.detail.as_deref(), Some("#streamer"));

    // A confirmed JOIN resets the backoff, so both retries are attempt 1.
    let attempts: Vec<(ConnectorStatus, u32)> = gw
        .accepted
        .lock()
        .unwrap()
        .iter()
        .map(|s| {
            let s = s.as_ref().unwrap();
            (s.status, s.reconnect_attempt)
        })
        .collect();
    assert_eq!(
        attempts,
        vec![
            (ConnectorStatus::Connecting, 0),
            (ConnectorStatus::Connecting, 1),
            (ConnectorStatus::Connecting, 1),
        ]
    );

    cancel.cancel();
    task.await.unwrap();
}

#[tokio::test]
async fn rejected_login_is_terminal() {
    let (ctx, mut client) = context();
    let gw = gateway(
        ctx.status.clone(),
        vec![vec![
            Step::Send(":tmi.twitch.tv NOTICE * :Login authentication failed".into()),
            Step::Hold,
        ]],
    )
    .await;

    tokio::time::timeout(
        Duration::from_secs(10),
        run(ctx.clone(), chat_config(&gw.url), fast_backoff(), CancellationToken::new()),
    )
    .await
    .expect("supervisor should stop on its own");

    let state = ctx.status.get(Platform::Twitch).unwrap();
    assert_eq!(state.status, ConnectorStatus::Error);
    assert!(state.detail.unwrap().contains("Login authentication failed"));
    assert_eq!(gw.accepted.lock().unwrap().len(), 1);

    let mut seen = Seen::default();
    drain(&mut client, &mut seen);
    assert_eq!(seen.notices.len(), 1);
    assert!(seen.notices[0].starts_with("Twitch: error ("));
}

#[tokio::test]
async fn invalid_channel_fails_without_connecting() {
    let (ctx, mut client) = context();
    let config = ChatConfig {
        channel: "not a channel!".into(),
        ..chat_config("ws://127.0.0.1:9")
    };

    run(ctx.clone(), config, fast_backoff(), CancellationToken::new()).await;

    let state = ctx.status.get(Platform::Twitch).unwrap();
    assert_eq!(state.status, ConnectorStatus::Error);
    assert_eq!(
        state.detail.as_deref(),
        Some("invalid Twitch channel 'not a channel!'")
    );
    let mut seen = Seen::default();
    drain(&mut client, &mut seen);
    assert_eq!(
        seen.notices,
        vec!["Twitch: error (invalid Twitch channel 'not a channel!')"]
    );
}

#[tokio::test]
async fn nothing_is_relayed_after_stop() {
    let (ctx, mut client) = context();
    let gw = gateway(ctx.status.clone(), vec![vec![joined(), Step::Stream]]).await;
    let run_ctx = ctx.clone();
    let url = gw.url.clone();
    let handle = ConnectorHandle::new(Platform::Twitch, ctx.status.clone(), move |cancel| {
        run(run_ctx.clone(), chat_config(&url), fast_backoff(), cancel).boxed()
    });

    handle.start();
    let mut seen = Seen::default();
    wait_until(&mut client, &mut seen, |s| s.chat_ids.len() >= 3).await;
    handle.stop().await;

    drain(&mut client, &mut seen);
    let relayed = seen.chat_ids.len();
    tokio::time::sleep(Duration::from_millis(200)).await;
    drain(&mut client, &mut seen);
    assert_eq!(seen.chat_ids.len(), relayed);

    let state = ctx.status.get(Platform::Twitch).unwrap();
    assert_eq!(state.status, ConnectorStatus::Disconnected);
    assert_eq!(state.detail.as_deref(), Some("stopped"));
}
