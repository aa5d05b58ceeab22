use serde::Serialize;
use tracing::warn;

use crate::{
    dto::{
        board::BoardSnapshot,
        sse::{ServerEvent, SystemStatus},
    },
    state::{board::BoardView, session::ClientIdentity},
};

const EVENT_BOARD: &str = "board";
const EVENT_SYSTEM_STATUS: &str = "system.status";

/// Board update projected for the receiving viewer.
pub fn board_event(view: BoardView, viewer: &ClientIdentity) -> Option<ServerEvent> {
    let snapshot = BoardSnapshot::project(view, viewer);
    to_event(EVENT_BOARD, &snapshot)
}

/// Degraded mode transition.
pub fn system_status_event(degraded: bool) -> Option<ServerEvent> {
    to_event(EVENT_SYSTEM_STATUS, &SystemStatus { degraded })
}

fn to_event(event: &str, payload: &impl Serialize) -> Option<ServerEvent> {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => Some(event),
        Err(err) => {
            warn!(event, error = %err, "failed to serialize SSE payload");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::*;
    use crate::state::session::{Participant, VoteType};

    fn participant(id: &str, vote: &str) -> Participant {
        Participant {
            id: id.to_string(),
            name: id.to_uppercase(),
            is_owner: id == "alice",
            has_voted: true,
            vote: Some(vote.to_string()),
        }
    }

    fn hidden_view() -> BoardView {
        BoardView {
            participants: vec![participant("alice", "3"), participant("bob", "8")],
            vote_type: VoteType::OneToTen,
            vote_options: vec!["3".into(), "8".into()],
            is_revealed: false,
            is_owner: false,
            owner_name: "ALICE".into(),
            current_participant: Some(participant("bob", "8")),
            numeric_votes: vec![3.0, 8.0],
            highest_vote: Some(8.0),
            lowest_vote: Some(3.0),
        }
    }

    #[test]
    fn board_event_is_projected_for_the_viewer() {
        let event = board_event(hidden_view(), &ClientIdentity::participant("bob")).unwrap();
        assert_eq!(event.event.as_deref(), Some("board"));

        let data: Value = serde_json::from_str(&event.data).unwrap();
        assert!(data["participants"][0].get("vote").is_none());
        assert_eq!(data["participants"][1]["vote"], "8");
        assert_eq!(data["currentParticipant"]["vote"], "8");
        assert!(data.get("highestVote").is_none());
        assert!(data.get("numericVotes").is_none());
    }

    #[test]
    fn system_status_carries_the_flag() {
        let event = system_status_event(true).unwrap();
        assert_eq!(event.event.as_deref(), Some("system.status"));
        assert_eq!(event.data, r#"{"degraded":true}"#);
    }
}
