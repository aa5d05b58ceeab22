use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Prefix applied to session document identifiers.
pub const SESSION_PREFIX: &str = "session::";

/// Build the document identifier holding one session.
pub fn session_doc_id(session_id: &str) -> String {
    format!("{SESSION_PREFIX}{session_id}")
}

/// One session node stored as a CouchDB document; `body` holds the session fields and the
/// participants map next to the CouchDB metadata.
#[derive(Debug, Serialize, Deserialize)]
pub struct CouchSessionDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", default, skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    #[serde(flatten)]
    pub body: Map<String, Value>,
}

impl CouchSessionDocument {
    /// Drop CouchDB bookkeeping fields (`_deleted`, `_conflicts`, ...) captured by the flatten.
    pub fn into_body(mut self) -> Map<String, Value> {
        self.body.retain(|key, _| !key.starts_with('_'));
        self.body
    }
}

/// Database information returned by `GET /{db}`.
#[derive(Debug, Deserialize)]
pub struct DatabaseInfo {
    pub update_seq: Value,
}

/// Payload returned by the `_changes` feed.
#[derive(Debug, Deserialize)]
pub struct ChangesResponse {
    #[serde(default)]
    pub results: Vec<Value>,
    pub last_seq: Value,
}

/// Render a sequence token as the `since` query value.
pub fn seq_param(seq: &Value) -> String {
    match seq {
        Value::String(raw) => raw.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn document_flattens_session_fields_next_to_metadata() {
        let mut body = Map::new();
        body.insert("ownerName".into(), json!("Alice"));
        let doc = CouchSessionDocument {
            id: session_doc_id("abc"),
            rev: None,
            body,
        };

        assert_eq!(
            serde_json::to_value(&doc).unwrap(),
            json!({ "_id": "session::abc", "ownerName": "Alice" })
        );
    }

    #[test]
    fn bookkeeping_fields_are_not_part_of_the_body() {
        let doc: CouchSessionDocument = serde_json::from_value(json!({
            "_id": "session::abc",
            "_rev": "2-xyz",
            "_conflicts": [],
            "isRevealed": true
        }))
        .unwrap();

        assert_eq!(doc.rev.as_deref(), Some("2-xyz"));
        assert_eq!(Value::Object(doc.into_body()), json!({ "isRevealed": true }));
    }

    #[test]
    fn sequence_tokens_keep_their_raw_form() {
        assert_eq!(seq_param(&json!("12-g1AAAA")), "12-g1AAAA");
        assert_eq!(seq_param(&json!(42)), "42");
    }
}
