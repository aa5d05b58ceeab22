//! Wire projection of the planning board.

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use utoipa::{IntoParams, ToSchema};

use crate::state::{
    board::BoardView,
    session::{ClientIdentity, Participant, VoteType},
};

/// One participant row as shown to a viewer.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantSummary {
    pub id: String,
    pub name: String,
    pub is_owner: bool,
    pub has_voted: bool,
    /// Present for the viewer's own record, and for everyone once the round is revealed.
    pub vote: Option<String>,
}

/// Planning board as sent to one viewer.
///
/// Before reveal, other participants' votes and the numeric aggregates are withheld.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BoardSnapshot {
    pub participants: Vec<ParticipantSummary>,
    pub vote_type: VoteType,
    pub vote_options: Vec<String>,
    pub is_revealed: bool,
    pub is_owner: bool,
    pub owner_name: String,
    pub current_participant: Option<ParticipantSummary>,
    pub numeric_votes: Option<Vec<f64>>,
    pub highest_vote: Option<f64>,
    pub lowest_vote: Option<f64>,
}

impl BoardSnapshot {
    /// Project `view` for `viewer`, masking what the round does not disclose yet.
    pub fn project(view: BoardView, viewer: &ClientIdentity) -> Self {
        let revealed = view.is_revealed;
        let summarize = |participant: Participant| ParticipantSummary {
            vote: participant
                .vote
                .filter(|_| revealed || viewer.is(&participant.id)),
            id: participant.id,
            name: participant.name,
            is_owner: participant.is_owner,
            has_voted: participant.has_voted,
        };

        let (numeric_votes, highest_vote, lowest_vote) = if revealed {
            (Some(view.numeric_votes), view.highest_vote, view.lowest_vote)
        } else {
            (None, None, None)
        };

        Self {
            participants: view.participants.into_iter().map(summarize).collect(),
            vote_type: view.vote_type,
            vote_options: view.vote_options,
            is_revealed: revealed,
            is_owner: view.is_owner,
            owner_name: view.owner_name,
            current_participant: view.current_participant.map(summarize),
            numeric_votes,
            highest_vote,
            lowest_vote,
        }
    }
}

/// Query parameters of the board stream; `EventSource` cannot send custom headers.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
#[serde(rename_all = "camelCase")]
pub struct BoardStreamQuery {
    /// Participant id of the viewing client.
    pub participant_id: Option<String>,
}
