use std::convert::Infallible;

use axum::{
    Router,
    extract::{Path, Query, State},
    response::sse::{Event, Sse},
    routing::get,
};
use futures::Stream;
use tracing::info;

use crate::{
    dto::board::BoardStreamQuery,
    error::AppError,
    services::sse_service,
    state::{SharedState, session::ClientIdentity},
};

#[utoipa::path(
    get,
    path = "/sse/sessions/{id}/board",
    tag = "sse",
    params(
        ("id" = String, Path, description = "Session identifier"),
        BoardStreamQuery
    ),
    responses(
        (status = 200, description = "Board SSE stream (`board` and `system.status` events)", content_type = "text/event-stream", body = String),
        (status = 404, description = "Unknown session")
    )
)]
/// Stream the board of one session, re-derived on every store change.
pub async fn board_stream(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    header_identity: ClientIdentity,
    Query(query): Query<BoardStreamQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let identity = if header_identity.participant_id().is_some() {
        header_identity
    } else {
        ClientIdentity::new(query.participant_id)
    };

    let stream = sse_service::board_stream(&state, &id, identity).await?;
    info!(session_id = %id, "New board SSE connection");
    Ok(stream)
}

/// Configure the SSE endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/sse/sessions/{id}/board", get(board_stream))
}
