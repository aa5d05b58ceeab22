use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI document for the planning poker backend.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sessions::create_session,
        crate::routes::sessions::join_session,
        crate::routes::sessions::update_vote_type,
        crate::routes::sessions::vote,
        crate::routes::sessions::reveal,
        crate::routes::sessions::new_round,
        crate::routes::sessions::board,
        crate::routes::sessions::join_link,
        crate::routes::sse::board_stream,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::health::HealthStatus,
            crate::dto::session::CreateSessionRequest,
            crate::dto::session::CreateSessionResponse,
            crate::dto::session::JoinSessionRequest,
            crate::dto::session::JoinSessionResponse,
            crate::dto::session::UpdateVoteTypeRequest,
            crate::dto::session::VoteRequest,
            crate::dto::session::ActionResponse,
            crate::dto::session::JoinLinkResponse,
            crate::dto::board::BoardSnapshot,
            crate::dto::board::ParticipantSummary,
            crate::dto::sse::SystemStatus,
            crate::state::session::VoteType,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "sessions", description = "Planning session lifecycle and voting"),
        (name = "sse", description = "Server-sent events streams"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_session_routes() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&str> = doc.paths.paths.keys().map(String::as_str).collect();
        for expected in [
            "/sessions",
            "/sessions/{id}/join",
            "/sessions/{id}/board",
            "/sse/sessions/{id}/board",
            "/healthcheck",
        ] {
            assert!(paths.contains(&expected), "missing {expected}");
        }
    }
}
