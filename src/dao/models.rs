//! Shapes of the documents stored in the shared state tree.
//!
//! Write models serialize exactly the fields a write owns. Snapshot models are lenient: any
//! missing or mistyped field falls back to its default instead of failing the whole read.

use serde::{Deserialize, Serialize};
use serde_with::{DefaultOnError, serde_as};

use crate::{
    dao::{
        session_store::KeyPath,
        storage::StorageResult,
    },
    state::session::VoteType,
};

/// Top-level key holding every session.
pub const SESSIONS_KEY: &str = "sessions";
/// Child key of a session holding its participants.
pub const PARTICIPANTS_KEY: &str = "participants";
/// Session field toggled by reveal and new round.
pub const FIELD_IS_REVEALED: &str = "isRevealed";
/// Session field holding the active vote preset key.
pub const FIELD_VOTE_TYPE: &str = "voteType";
/// Participant field holding the cast token.
pub const FIELD_VOTE: &str = "vote";
/// Participant field flagging a cast vote.
pub const FIELD_HAS_VOTED: &str = "hasVoted";

/// `sessions/{session_id}`
pub fn session_path(session_id: &str) -> StorageResult<KeyPath> {
    KeyPath::root(SESSIONS_KEY)?.join(session_id)
}

/// `sessions/{session_id}/participants`
pub fn participants_path(session_id: &str) -> StorageResult<KeyPath> {
    Ok(session_path(session_id)?.child(PARTICIPANTS_KEY))
}

/// `sessions/{session_id}/participants/{participant_id}`
pub fn participant_path(session_id: &str, participant_id: &str) -> StorageResult<KeyPath> {
    participants_path(session_id)?.join(participant_id)
}

/// Session fields written when a session is created.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionDocument {
    pub owner_name: String,
    pub is_owner: bool,
    pub is_revealed: bool,
    pub vote_type: VoteType,
}

/// Participant record written on join.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantDocument {
    pub name: String,
    pub is_owner: bool,
    pub has_voted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vote: Option<String>,
}

/// Session fields as read back from the store.
#[serde_as]
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionSnapshot {
    #[serde_as(as = "DefaultOnError")]
    pub owner_name: String,
    #[serde_as(as = "DefaultOnError")]
    pub is_owner: bool,
    #[serde_as(as = "DefaultOnError")]
    pub is_revealed: bool,
    /// Raw preset key; unknown keys are resolved by [`VoteType::resolve`].
    #[serde_as(as = "DefaultOnError")]
    pub vote_type: Option<String>,
}

/// Participant fields (without the id, which is the node key) as read back from the store.
#[serde_as]
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ParticipantSnapshot {
    #[serde_as(as = "DefaultOnError")]
    pub name: String,
    #[serde_as(as = "DefaultOnError")]
    pub is_owner: bool,
    #[serde_as(as = "DefaultOnError")]
    pub has_voted: bool,
    #[serde_as(as = "DefaultOnError")]
    pub vote: Option<String>,
}
