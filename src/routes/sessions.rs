use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
};
use axum_valid::Valid;
use tracing::debug;

use crate::{
    dto::{
        board::BoardSnapshot,
        session::{
            ActionResponse, CreateSessionRequest, CreateSessionResponse, JoinLinkQuery,
            JoinLinkResponse, JoinSessionRequest, JoinSessionResponse, UpdateVoteTypeRequest,
            VoteRequest,
        },
    },
    error::AppError,
    services::{board_service, join_link as links, session_service},
    state::{SharedState, session::ClientIdentity},
};

/// Routes driving the planning session lifecycle.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/sessions", post(create_session))
        .route("/sessions/{id}/join", post(join_session))
        .route("/sessions/{id}/vote-type", put(update_vote_type))
        .route("/sessions/{id}/vote", post(vote))
        .route("/sessions/{id}/reveal", post(reveal))
        .route("/sessions/{id}/new-round", post(new_round))
        .route("/sessions/{id}/board", get(board))
        .route("/sessions/{id}/join-link", get(join_link))
}

/// Open a new session owned by the caller.
#[utoipa::path(
    post,
    path = "/sessions",
    tag = "sessions",
    request_body = CreateSessionRequest,
    responses(
        (status = 201, description = "Session created", body = CreateSessionResponse),
        (status = 400, description = "Invalid owner name")
    )
)]
pub async fn create_session(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<CreateSessionRequest>>,
) -> Result<(StatusCode, Json<CreateSessionResponse>), AppError> {
    let created = session_service::create_session(&state, &payload.owner_name).await?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

/// Join a session, reusing the caller's participant id when it is already registered.
#[utoipa::path(
    post,
    path = "/sessions/{id}/join",
    tag = "sessions",
    params(("id" = String, Path, description = "Session identifier")),
    request_body = JoinSessionRequest,
    responses(
        (status = 200, description = "Participant registered", body = JoinSessionResponse),
        (status = 404, description = "Unknown session")
    )
)]
pub async fn join_session(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    identity: ClientIdentity,
    Valid(Json(payload)): Valid<Json<JoinSessionRequest>>,
) -> Result<Json<JoinSessionResponse>, AppError> {
    let participant_id =
        session_service::join_session(&state, &id, &payload.name, &identity).await?;
    Ok(Json(JoinSessionResponse { participant_id }))
}

/// Switch the voting scale of a session.
#[utoipa::path(
    put,
    path = "/sessions/{id}/vote-type",
    tag = "sessions",
    params(("id" = String, Path, description = "Session identifier")),
    request_body = UpdateVoteTypeRequest,
    responses(
        (status = 200, description = "Vote type updated", body = ActionResponse),
        (status = 404, description = "Unknown session")
    )
)]
pub async fn update_vote_type(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateVoteTypeRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    session_service::update_vote_type(&state, &id, payload.vote_type).await?;
    Ok(Json(ActionResponse::new(format!(
        "vote type set to {}",
        payload.vote_type.key()
    ))))
}

/// Cast or replace the caller's vote.
#[utoipa::path(
    post,
    path = "/sessions/{id}/vote",
    tag = "sessions",
    params(
        ("id" = String, Path, description = "Session identifier"),
        ("x-participant-id" = String, Header, description = "Participant id of the voter")
    ),
    request_body = VoteRequest,
    responses(
        (status = 200, description = "Vote recorded", body = ActionResponse),
        (status = 401, description = "Missing participant id"),
        (status = 404, description = "Unknown session or participant")
    )
)]
pub async fn vote(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    identity: ClientIdentity,
    Valid(Json(payload)): Valid<Json<VoteRequest>>,
) -> Result<Json<ActionResponse>, AppError> {
    session_service::vote(&state, &id, &identity, &payload.value).await?;
    Ok(Json(ActionResponse::new("vote recorded")))
}

/// Reveal every vote of the current round.
#[utoipa::path(
    post,
    path = "/sessions/{id}/reveal",
    tag = "sessions",
    params(("id" = String, Path, description = "Session identifier")),
    responses(
        (status = 200, description = "Votes revealed", body = ActionResponse),
        (status = 404, description = "Unknown session")
    )
)]
pub async fn reveal(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<ActionResponse>, AppError> {
    session_service::reveal(&state, &id).await?;
    Ok(Json(ActionResponse::new("votes revealed")))
}

/// Hide the board and clear every vote.
#[utoipa::path(
    post,
    path = "/sessions/{id}/new-round",
    tag = "sessions",
    params(("id" = String, Path, description = "Session identifier")),
    responses(
        (status = 200, description = "New round started", body = ActionResponse),
        (status = 404, description = "Unknown session")
    )
)]
pub async fn new_round(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<ActionResponse>, AppError> {
    session_service::new_round(&state, &id).await?;
    Ok(Json(ActionResponse::new("new round started")))
}

/// Current board as seen by the caller.
#[utoipa::path(
    get,
    path = "/sessions/{id}/board",
    tag = "sessions",
    params(
        ("id" = String, Path, description = "Session identifier"),
        ("x-participant-id" = Option<String>, Header, description = "Participant id of the viewer")
    ),
    responses(
        (status = 200, description = "Board snapshot", body = BoardSnapshot),
        (status = 404, description = "Unknown session")
    )
)]
pub async fn board(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    identity: ClientIdentity,
) -> Result<Json<BoardSnapshot>, AppError> {
    let view = board_service::get_board(&state, &id, &identity).await?;
    Ok(Json(BoardSnapshot::project(view, &identity)))
}

/// Turn the session page URL into the link participants should open.
#[utoipa::path(
    get,
    path = "/sessions/{id}/join-link",
    tag = "sessions",
    params(
        ("id" = String, Path, description = "Session identifier"),
        JoinLinkQuery
    ),
    responses((status = 200, description = "Shareable join URL", body = JoinLinkResponse))
)]
pub async fn join_link(
    Path(id): Path<String>,
    Query(query): Query<JoinLinkQuery>,
) -> Json<JoinLinkResponse> {
    debug!(session_id = %id, "building join link");
    Json(JoinLinkResponse {
        url: links::join_link(&query.url),
    })
}
