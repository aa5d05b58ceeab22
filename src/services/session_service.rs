//! Writer boundary to the session store: every mutation of sessions and participants goes
//! through these helpers.

use rand::{Rng, distr::Alphanumeric};
use serde_json::{Map, Value, json, to_value};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    dao::{
        models::{
            FIELD_HAS_VOTED, FIELD_IS_REVEALED, FIELD_VOTE, FIELD_VOTE_TYPE, PARTICIPANTS_KEY,
            ParticipantDocument, SessionDocument, participant_path, participants_path, session_path,
        },
        session_store::SessionStore,
    },
    error::ServiceError,
    state::{
        SharedState,
        session::{ClientIdentity, VoteType},
    },
};

const SESSION_ID_LENGTH: usize = 20;

/// Identifiers handed back to the client that created a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedSession {
    /// Key of the new session node.
    pub session_id: String,
    /// Participant id of the owner; the client persists it as its identity.
    pub participant_id: String,
}

/// Allocate a session owned by `owner_name` and register the owner as its first participant.
pub async fn create_session(
    state: &SharedState,
    owner_name: &str,
) -> Result<CreatedSession, ServiceError> {
    let owner_name = require_name(owner_name, "owner name")?;
    let store = state.require_session_store().await?;

    let session_id = generate_session_id();
    let participant_id = generate_participant_id();

    let mut session = to_map(SessionDocument {
        owner_name: owner_name.clone(),
        is_owner: true,
        is_revealed: false,
        vote_type: VoteType::default(),
    })?;
    let owner = to_value(ParticipantDocument {
        name: owner_name,
        is_owner: true,
        has_voted: false,
        vote: None,
    })
    .map_err(|err| ServiceError::InvalidInput(err.to_string()))?;
    let mut participants = Map::new();
    participants.insert(participant_id.clone(), owner);
    session.insert(PARTICIPANTS_KEY.into(), Value::Object(participants));

    store
        .set(session_path(&session_id)?, Value::Object(session))
        .await?;

    info!(%session_id, %participant_id, "session created");
    Ok(CreatedSession {
        session_id,
        participant_id,
    })
}

/// Register `name` as a participant of an existing session.
///
/// A client that already joined this session (same participant id) keeps its record.
pub async fn join_session(
    state: &SharedState,
    session_id: &str,
    name: &str,
    identity: &ClientIdentity,
) -> Result<String, ServiceError> {
    let name = require_name(name, "participant name")?;
    let store = state.require_session_store().await?;
    ensure_session_exists(store.as_ref(), session_id).await?;

    if let Some(existing) = identity.participant_id() {
        let path = participant_path(session_id, existing)?;
        if store.read(path).await?.is_some() {
            debug!(%session_id, participant_id = existing, "participant rejoined session");
            return Ok(existing.to_string());
        }
    }

    let participant_id = generate_participant_id();
    let record = to_value(ParticipantDocument {
        name,
        is_owner: false,
        has_voted: false,
        vote: None,
    })
    .map_err(|err| ServiceError::InvalidInput(err.to_string()))?;

    store
        .set(participant_path(session_id, &participant_id)?, record)
        .await?;

    info!(%session_id, %participant_id, "participant joined session");
    Ok(participant_id)
}

/// Switch the scale used by the session. Votes already cast are kept as they are.
pub async fn update_vote_type(
    state: &SharedState,
    session_id: &str,
    vote_type: VoteType,
) -> Result<(), ServiceError> {
    let store = state.require_session_store().await?;
    ensure_session_exists(store.as_ref(), session_id).await?;
    let path = session_path(session_id)?.child(FIELD_VOTE_TYPE);
    store.set(path, json!(vote_type.key())).await?;

    debug!(%session_id, vote_type = vote_type.key(), "vote type updated");
    Ok(())
}

/// Record `value` as the vote of the calling participant. Any token is accepted.
pub async fn vote(
    state: &SharedState,
    session_id: &str,
    identity: &ClientIdentity,
    value: &str,
) -> Result<(), ServiceError> {
    let participant_id = identity.participant_id().ok_or_else(|| {
        ServiceError::Unauthorized("voting requires a participant identity".into())
    })?;
    let store = state.require_session_store().await?;
    let path = participant_path(session_id, participant_id)?;
    if store.read(path.clone()).await?.is_none() {
        return Err(ServiceError::NotFound(format!(
            "participant `{participant_id}` not found in session `{session_id}`"
        )));
    }

    let mut fields = Map::new();
    fields.insert(FIELD_VOTE.into(), json!(value));
    fields.insert(FIELD_HAS_VOTED.into(), json!(true));
    store.update(path, fields).await?;

    debug!(%session_id, %participant_id, "vote recorded");
    Ok(())
}

/// Expose every vote of the current round. Revealing twice is harmless.
pub async fn reveal(state: &SharedState, session_id: &str) -> Result<(), ServiceError> {
    set_revealed(state, session_id, true).await?;
    info!(%session_id, "votes revealed");
    Ok(())
}

/// Hide results again and clear the vote of every participant, in a single multi-path write.
pub async fn new_round(state: &SharedState, session_id: &str) -> Result<(), ServiceError> {
    let store = state.require_session_store().await?;
    ensure_session_exists(store.as_ref(), session_id).await?;
    let session = session_path(session_id)?;

    let participants = store.read(participants_path(session_id)?).await?;
    let participant_ids = participants
        .as_ref()
        .and_then(Value::as_object)
        .map(|entries| entries.keys().cloned().collect::<Vec<_>>())
        .unwrap_or_default();

    let mut writes = vec![(session.child(FIELD_IS_REVEALED), json!(false))];
    for participant_id in &participant_ids {
        let participant = participant_path(session_id, participant_id)?;
        writes.push((participant.child(FIELD_VOTE), Value::Null));
        writes.push((participant.child(FIELD_HAS_VOTED), json!(false)));
    }
    store.update_many(writes).await?;

    info!(%session_id, participants = participant_ids.len(), "new round started");
    Ok(())
}

async fn set_revealed(
    state: &SharedState,
    session_id: &str,
    revealed: bool,
) -> Result<(), ServiceError> {
    let store = state.require_session_store().await?;
    ensure_session_exists(store.as_ref(), session_id).await?;
    let path = session_path(session_id)?.child(FIELD_IS_REVEALED);
    store.set(path, json!(revealed)).await?;
    Ok(())
}

async fn ensure_session_exists(
    store: &dyn SessionStore,
    session_id: &str,
) -> Result<(), ServiceError> {
    match store.read(session_path(session_id)?).await? {
        Some(_) => Ok(()),
        None => Err(ServiceError::NotFound(format!(
            "session `{session_id}` not found"
        ))),
    }
}

fn require_name(raw: &str, what: &str) -> Result<String, ServiceError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(ServiceError::InvalidInput(format!("{what} must not be empty")));
    }
    Ok(name.to_string())
}

fn to_map(document: impl serde::Serialize) -> Result<Map<String, Value>, ServiceError> {
    match to_value(document) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ServiceError::InvalidInput(
            "document must serialize to an object".into(),
        )),
        Err(err) => Err(ServiceError::InvalidInput(err.to_string())),
    }
}

fn generate_session_id() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(SESSION_ID_LENGTH)
        .map(char::from)
        .collect()
}

fn generate_participant_id() -> String {
    Uuid::new_v4().simple().to_string()
}
