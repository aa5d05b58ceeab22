use serde::{Deserialize, Serialize};
use tracing::debug;
use utoipa::ToSchema;

/// Voting scale selected for a session.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum VoteType {
    /// `1 2 3 5 8 13 ?`
    Fibonacci,
    /// `1` to `10` and `?`; the default scale.
    #[default]
    OneToTen,
    /// Powers of two from `2` to `128` and `?`.
    Double,
}

impl VoteType {
    /// Every known scale, in display order.
    pub const ALL: [VoteType; 3] = [VoteType::Fibonacci, VoteType::OneToTen, VoteType::Double];

    /// Key under which the scale is stored.
    pub fn key(self) -> &'static str {
        match self {
            VoteType::Fibonacci => "fibonacci",
            VoteType::OneToTen => "onetoten",
            VoteType::Double => "double",
        }
    }

    /// Parse a stored key.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|candidate| candidate.key() == key)
    }

    /// Resolve a possibly absent or unknown stored key, falling back to the default scale.
    pub fn resolve(raw: Option<&str>) -> Self {
        match raw {
            None | Some("") => Self::default(),
            Some(key) => Self::from_key(key).unwrap_or_else(|| {
                debug!(vote_type = key, "unknown vote type; using default preset");
                Self::default()
            }),
        }
    }
}

/// Ordered token lists offered for each [`VoteType`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VotePresets {
    fibonacci: Vec<String>,
    one_to_ten: Vec<String>,
    double: Vec<String>,
}

impl VotePresets {
    /// Tokens for a known scale.
    pub fn tokens(&self, vote_type: VoteType) -> &[String] {
        match vote_type {
            VoteType::Fibonacci => &self.fibonacci,
            VoteType::OneToTen => &self.one_to_ten,
            VoteType::Double => &self.double,
        }
    }

    /// Resolve a raw stored key to its scale and tokens.
    pub fn active(&self, raw: Option<&str>) -> (VoteType, &[String]) {
        let vote_type = VoteType::resolve(raw);
        (vote_type, self.tokens(vote_type))
    }

    /// Replace the tokens of one scale. Empty lists are ignored so a scale is never empty.
    pub fn with_tokens(mut self, vote_type: VoteType, tokens: Vec<String>) -> Self {
        if tokens.is_empty() {
            return self;
        }
        match vote_type {
            VoteType::Fibonacci => self.fibonacci = tokens,
            VoteType::OneToTen => self.one_to_ten = tokens,
            VoteType::Double => self.double = tokens,
        }
        self
    }
}

impl Default for VotePresets {
    fn default() -> Self {
        Self {
            fibonacci: tokens(&["1", "2", "3", "5", "8", "13", "?"]),
            one_to_ten: tokens(&["1", "2", "3", "4", "5", "6", "7", "8", "9", "10", "?"]),
            double: tokens(&["2", "4", "8", "16", "32", "64", "128", "?"]),
        }
    }
}

fn tokens(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

/// Participant as shown on the planning board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    /// Key of the participant node.
    pub id: String,
    /// Display name given on join.
    pub name: String,
    /// Whether this participant created the session.
    pub is_owner: bool,
    /// Whether a vote was cast in the current round.
    pub has_voted: bool,
    /// Cast token, if any.
    pub vote: Option<String>,
}

/// Identity of the client issuing a call: the participant id it persisted locally, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientIdentity {
    participant_id: Option<String>,
}

impl ClientIdentity {
    /// Build an identity from an optional participant id; blank ids count as absent.
    pub fn new(participant_id: Option<String>) -> Self {
        Self {
            participant_id: participant_id.filter(|id| !id.trim().is_empty()),
        }
    }

    /// A client that has not joined any session yet.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// A client known as `participant_id`.
    pub fn participant(participant_id: impl Into<String>) -> Self {
        Self::new(Some(participant_id.into()))
    }

    /// Participant id carried by the client, if any.
    pub fn participant_id(&self) -> Option<&str> {
        self.participant_id.as_deref()
    }

    /// Whether this client is the given participant.
    pub fn is(&self, participant_id: &str) -> bool {
        self.participant_id() == Some(participant_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_known_vote_type_has_a_non_empty_preset() {
        let presets = VotePresets::default();
        for vote_type in VoteType::ALL {
            let (resolved, tokens) = presets.active(Some(vote_type.key()));
            assert_eq!(resolved, vote_type);
            assert!(!tokens.is_empty());
        }
        assert_eq!(
            presets.tokens(VoteType::Fibonacci),
            ["1", "2", "3", "5", "8", "13", "?"]
        );
    }

    #[test]
    fn unknown_or_missing_vote_type_falls_back_to_one_to_ten() {
        let presets = VotePresets::default();
        for raw in [None, Some(""), Some("tshirt"), Some("Fibonacci")] {
            let (resolved, tokens) = presets.active(raw);
            assert_eq!(resolved, VoteType::OneToTen);
            assert_eq!(tokens, presets.tokens(VoteType::OneToTen));
        }
    }

    #[test]
    fn vote_type_serializes_to_stored_keys() {
        for vote_type in VoteType::ALL {
            let json = serde_json::to_value(vote_type).unwrap();
            assert_eq!(json, serde_json::Value::String(vote_type.key().into()));
        }
    }

    #[test]
    fn empty_override_keeps_built_in_tokens() {
        let presets = VotePresets::default()
            .with_tokens(VoteType::Double, Vec::new())
            .with_tokens(VoteType::Fibonacci, vec!["0".into(), "1".into()]);
        assert_eq!(presets.tokens(VoteType::Double).len(), 8);
        assert_eq!(presets.tokens(VoteType::Fibonacci), ["0", "1"]);
    }

    #[test]
    fn blank_participant_id_is_anonymous() {
        assert_eq!(ClientIdentity::new(Some("  ".into())), ClientIdentity::anonymous());
        assert!(ClientIdentity::participant("p1").is("p1"));
        assert!(!ClientIdentity::anonymous().is("p1"));
    }
}
