//! Planning board view-model: a pure projection of the session and participants snapshots.
//!
//! The board is recomputed from the full snapshots on every change; there is no diffing.

use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;

use crate::{
    dao::models::{ParticipantSnapshot, SessionSnapshot},
    state::session::{ClientIdentity, Participant, VotePresets, VoteType},
};

/// Everything a client needs to render the planning board.
#[derive(Debug, Clone, PartialEq)]
pub struct BoardView {
    /// Participants in the store's key order.
    pub participants: Vec<Participant>,
    /// Active scale after resolving unknown keys.
    pub vote_type: VoteType,
    /// Tokens offered by the active scale.
    pub vote_options: Vec<String>,
    /// Whether the current round's votes are disclosed.
    pub is_revealed: bool,
    /// Whether the viewer owns the session.
    pub is_owner: bool,
    /// Display name of the session owner.
    pub owner_name: String,
    /// Record of the viewing client, when it is one of the participants.
    pub current_participant: Option<Participant>,
    /// Votes that read as finite numbers, in participant order.
    pub numeric_votes: Vec<f64>,
    /// Largest numeric vote; `None` when there is none.
    pub highest_vote: Option<f64>,
    /// Smallest numeric vote; `None` when there is none.
    pub lowest_vote: Option<f64>,
}

/// Decode the session node, defaulting every missing or malformed field.
pub fn session_from_snapshot(value: Option<&Value>) -> SessionSnapshot {
    value
        .and_then(|value| serde_json::from_value(value.clone()).ok())
        .unwrap_or_default()
}

/// Decode the participants node, keeping key order and skipping entries that are not records.
pub fn participants_from_snapshot(value: Option<&Value>) -> IndexMap<String, ParticipantSnapshot> {
    let Some(Value::Object(entries)) = value else {
        return IndexMap::new();
    };

    entries
        .iter()
        .filter_map(|(id, fields)| {
            if !fields.is_object() {
                debug!(participant_id = %id, "skipping malformed participant entry");
                return None;
            }
            let snapshot = serde_json::from_value(fields.clone()).ok()?;
            Some((id.clone(), snapshot))
        })
        .collect()
}

/// Build the board for `viewer` from the two snapshots.
pub fn derive_board(
    session: &SessionSnapshot,
    participants: IndexMap<String, ParticipantSnapshot>,
    presets: &VotePresets,
    viewer: &ClientIdentity,
) -> BoardView {
    let participants = participants
        .into_iter()
        .map(|(id, fields)| Participant {
            id,
            name: fields.name,
            is_owner: fields.is_owner,
            has_voted: fields.has_voted || fields.vote.is_some(),
            vote: fields.vote,
        })
        .collect::<Vec<_>>();

    let current_participant = viewer
        .participant_id()
        .and_then(|id| participants.iter().find(|participant| participant.id == id))
        .cloned();

    let (vote_type, vote_options) = presets.active(session.vote_type.as_deref());
    let is_owner = current_participant
        .as_ref()
        .map_or(session.is_owner, |participant| participant.is_owner);

    let numeric_votes = numeric_votes(&participants);
    let highest_vote = highest_vote(&numeric_votes);
    let lowest_vote = lowest_vote(&numeric_votes);

    BoardView {
        participants,
        vote_type,
        vote_options: vote_options.to_vec(),
        is_revealed: session.is_revealed,
        is_owner,
        owner_name: session.owner_name.clone(),
        current_participant,
        numeric_votes,
        highest_vote,
        lowest_vote,
    }
}

/// Votes that read as numbers, in participant order. `?` and other tokens are skipped.
pub fn numeric_votes(participants: &[Participant]) -> Vec<f64> {
    participants
        .iter()
        .filter_map(|participant| participant.vote.as_deref())
        .filter_map(parse_numeric)
        .collect()
}

/// Largest of `votes`, if any.
pub fn highest_vote(votes: &[f64]) -> Option<f64> {
    votes.iter().copied().reduce(f64::max)
}

/// Smallest of `votes`, if any.
pub fn lowest_vote(votes: &[f64]) -> Option<f64> {
    votes.iter().copied().reduce(f64::min)
}

fn parse_numeric(token: &str) -> Option<f64> {
    token
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn participant(id: &str, vote: Option<&str>) -> Participant {
        Participant {
            id: id.into(),
            name: id.to_uppercase(),
            is_owner: false,
            has_voted: vote.is_some(),
            vote: vote.map(str::to_string),
        }
    }

    fn board(session: Value, participants: Value, viewer: &ClientIdentity) -> BoardView {
        derive_board(
            &session_from_snapshot(Some(&session)),
            participants_from_snapshot(Some(&participants)),
            &VotePresets::default(),
            viewer,
        )
    }

    #[test]
    fn numeric_votes_skip_non_numeric_tokens() {
        let participants = vec![
            participant("a", Some("8")),
            participant("b", Some("?")),
            participant("c", None),
            participant("d", Some("2.5")),
            participant("e", Some("coffee")),
        ];
        assert_eq!(numeric_votes(&participants), vec![8.0, 2.5]);
    }

    #[test]
    fn extremes_are_absent_exactly_when_no_numeric_vote() {
        assert_eq!(highest_vote(&[]), None);
        assert_eq!(lowest_vote(&[]), None);

        let only_unknown = numeric_votes(&[participant("a", Some("?"))]);
        assert!(only_unknown.is_empty());
        assert_eq!(highest_vote(&only_unknown), None);

        let votes = [5.0, 13.0, 1.0];
        assert_eq!(highest_vote(&votes), Some(13.0));
        assert_eq!(lowest_vote(&votes), Some(1.0));
    }

    #[test]
    fn participants_keep_snapshot_key_order() {
        let view = board(
            json!({ "ownerName": "Alice" }),
            json!({
                "zz": { "name": "Zed" },
                "aa": { "name": "Ann" },
                "mm": { "name": "Max" }
            }),
            &ClientIdentity::anonymous(),
        );
        let ids = view
            .participants
            .iter()
            .map(|participant| participant.id.as_str())
            .collect::<Vec<_>>();
        assert_eq!(ids, ["zz", "aa", "mm"]);
    }

    #[test]
    fn absent_session_uses_defaults() {
        let view = derive_board(
            &session_from_snapshot(None),
            participants_from_snapshot(None),
            &VotePresets::default(),
            &ClientIdentity::anonymous(),
        );

        assert!(!view.is_revealed);
        assert!(!view.is_owner);
        assert_eq!(view.owner_name, "");
        assert_eq!(view.vote_type, VoteType::OneToTen);
        assert_eq!(view.vote_options.len(), 11);
        assert!(view.participants.is_empty());
        assert_eq!(view.highest_vote, None);
    }

    #[test]
    fn unknown_vote_type_uses_one_to_ten_options() {
        let view = board(
            json!({ "voteType": "tshirt" }),
            json!({}),
            &ClientIdentity::anonymous(),
        );
        assert_eq!(view.vote_type, VoteType::OneToTen);
        assert_eq!(view.vote_options.last().map(String::as_str), Some("?"));
    }

    #[test]
    fn current_participant_is_cached_for_the_viewer() {
        let view = board(
            json!({ "ownerName": "Alice", "isOwner": true, "voteType": "fibonacci" }),
            json!({
                "alice": { "name": "Alice", "isOwner": true, "hasVoted": false },
                "bob": { "name": "Bob", "isOwner": false, "hasVoted": true, "vote": "8" }
            }),
            &ClientIdentity::participant("bob"),
        );

        let current = view.current_participant.expect("viewer is a participant");
        assert_eq!(current.id, "bob");
        assert_eq!(current.vote.as_deref(), Some("8"));
        assert!(!view.is_owner);
        assert_eq!(view.vote_options, ["1", "2", "3", "5", "8", "13", "?"]);
    }

    #[test]
    fn unknown_viewer_falls_back_to_session_owner_flag() {
        let view = board(
            json!({ "isOwner": true }),
            json!({ "alice": { "name": "Alice", "isOwner": true } }),
            &ClientIdentity::participant("ghost"),
        );
        assert!(view.current_participant.is_none());
        assert!(view.is_owner);
    }

    #[test]
    fn malformed_participant_entries_are_skipped() {
        let view = board(
            json!({}),
            json!({ "a": "not a record", "b": { "name": "Bob", "vote": "3" } }),
            &ClientIdentity::anonymous(),
        );
        assert_eq!(view.participants.len(), 1);
        assert_eq!(view.numeric_votes, vec![3.0]);
    }
}
