use std::{convert::Infallible, pin::pin};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::info;

use crate::{
    dto::sse::ServerEvent,
    error::ServiceError,
    services::{board_service, sse_events},
    state::{SharedState, session::ClientIdentity},
};

/// Open a board stream for `identity`, forwarding board updates and degraded mode changes
/// until the client disconnects or the store closes the feed.
pub async fn board_stream(
    state: &SharedState,
    session_id: &str,
    identity: ClientIdentity,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>> + use<>>, ServiceError> {
    let boards = board_service::watch_board(state, session_id, identity.clone()).await?;
    let mut degraded = state.degraded_watcher();
    let keep_alive = state.config().keep_alive();
    let session_id = session_id.to_string();

    // small bounded channel between forwarder and response
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    tokio::spawn(async move {
        let mut boards = pin!(boards);
        loop {
            let next = tokio::select! {
                _ = tx.closed() => break,
                board = boards.next() => match board {
                    Some(view) => sse_events::board_event(view, &identity),
                    None => break,
                },
                changed = degraded.changed() => match changed {
                    Ok(()) => {
                        let is_degraded = *degraded.borrow_and_update();
                        sse_events::system_status_event(is_degraded)
                    }
                    Err(_) => break,
                },
            };

            let Some(payload) = next else {
                continue;
            };
            if tx.send(Ok(to_event(payload))).await.is_err() {
                break;
            }
        }

        info!(%session_id, "board SSE stream disconnected");
    });

    // response stream reads from mpsc; when client disconnects axum drops this stream
    let stream = ReceiverStream::new(rx);
    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(keep_alive).text("keep-alive")))
}

fn to_event(payload: ServerEvent) -> Event {
    let event = Event::default().data(payload.data);
    match payload.event {
        Some(name) => event.event(name),
        None => event,
    }
}
