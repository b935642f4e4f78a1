use std::convert::Infallible;

use axum::{
    extract::State,
    response::sse::{Event, Sse},
};
use futures::{Stream, StreamExt};
use tokio_stream::wrappers::ReceiverStream;

use crate::app::SharedState;
use crate::broadcaster::{ClientRegistration, Outbound, TransportKind};

/// Server-Sent Events push channel. Frames go out as `data:` lines and
/// heartbeats as `: heartbeat` comments.
pub async fn sse_handler(
    State(state): State<SharedState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let ClientRegistration {
        receiver, guard, ..
    } = state.broadcaster().register_client(TransportKind::Sse);
    let shutdown = state.shutdown_token().clone().cancelled_owned();

    // The guard lives inside the stream; dropping the response unregisters.
    let stream = ReceiverStream::new(receiver)
        .map(move |item| {
            guard.touch();
            Ok(match item {
                Outbound::Frame(text) => Event::default().data(&*text),
                Outbound::Ping => Event::default().comment("heartbeat"),
            })
        })
        .take_until(shutdown);

    Sse::new(stream)
}
