//! DTO definitions for the session write endpoints.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{
    dto::validation::validate_display_name,
    services::session_service::CreatedSession,
    state::session::VoteType,
};

/// Payload opening a new planning session.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    /// Display name of the session owner.
    #[validate(custom(function = "validate_display_name"))]
    pub owner_name: String,
}

/// Identifiers handed back to the creator of a session.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionResponse {
    pub session_id: String,
    /// Participant id of the owner; clients send it back in `x-participant-id`.
    pub participant_id: String,
}

impl From<CreatedSession> for CreateSessionResponse {
    fn from(value: CreatedSession) -> Self {
        Self {
            session_id: value.session_id,
            participant_id: value.participant_id,
        }
    }
}

/// Payload joining an existing session.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct JoinSessionRequest {
    #[validate(custom(function = "validate_display_name"))]
    pub name: String,
}

/// Participant id assigned (or reused) on join.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JoinSessionResponse {
    pub participant_id: String,
}

/// Payload switching the session's voting scale.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateVoteTypeRequest {
    pub vote_type: VoteType,
}

/// Payload casting a vote for the calling participant.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct VoteRequest {
    /// Chosen token, usually one of the board's vote options.
    #[validate(length(min = 1, max = 16))]
    pub value: String,
}

/// Generic action acknowledgement used by the owner endpoints.
#[derive(Debug, Serialize, ToSchema)]
pub struct ActionResponse {
    pub message: String,
}

impl ActionResponse {
    /// Build an acknowledgement carrying `message`.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Query parameters of the join link endpoint.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct JoinLinkQuery {
    /// Session page URL as shown in the owner's browser.
    pub url: String,
}

/// Shareable join URL.
#[derive(Debug, Serialize, ToSchema)]
pub struct JoinLinkResponse {
    pub url: String,
}
