use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// Voter session as held in memory and mirrored into session storage
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub credential: Option<String>,
    pub has_voted: bool,
}

impl Session {
    pub fn voter_state(&self) -> VoterState {
        match (&self.credential, self.has_voted) {
            (None, _) => VoterState::Unregistered,
            (Some(_), false) => VoterState::Registered,
            (Some(_), true) => VoterState::Voted,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoterState {
    Unregistered,
    Registered,
    Voted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: i64,
    pub name: String,
}

// Result rows are rendered as-is, so any JSON type is accepted and missing fields stay empty
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct ResultRow {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub name: Option<Value>,
    #[serde(default)]
    pub votes: Option<Value>,
}

fn cell_text(value: &Option<Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

impl ResultRow {
    #[cfg(test)]
    pub fn new(id: i64, name: &str, votes: i64) -> Self {
        Self {
            id: Some(Value::from(id)),
            name: Some(Value::from(name)),
            votes: Some(Value::from(votes)),
        }
    }

    pub fn cells(&self) -> [String; 3] {
        [cell_text(&self.id), cell_text(&self.name), cell_text(&self.votes)]
    }
}

// --- Wire bodies ---

#[derive(Debug, Serialize)]
pub struct RegisterRequest<'a> {
    pub citizen_card_number: &'a str,
}

#[derive(Debug, Default, Deserialize)]
pub struct RegisterResponse {
    #[serde(default)]
    pub is_eligible: bool,
    #[serde(default)]
    pub voting_credential: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VoteRequest<'a> {
    pub voting_credential: &'a str,
    pub candidate_id: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct VoteResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct HealthResponse {
    #[serde(default)]
    pub status: Option<String>,
}

// Pull a list field out of a response body; anything that is not an array counts as empty
pub fn list_field<T: for<'de> Deserialize<'de>>(body: &Value, field: &str) -> Vec<T> {
    match body.get(field) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match serde_json::from_value(item.clone()) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("Skipping malformed '{}' entry {}: {}", field, item, e);
                    None
                }
            })
            .collect(),
        _ => Vec::new(),
    }
}

// Decode a response body leniently, falling back to the defaults of every field
pub fn lenient<T: for<'de> Deserialize<'de> + Default>(body: Value) -> T {
    serde_json::from_value(body).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn voter_state_follows_session_flags() {
        let mut session = Session::default();
        assert_eq!(session.voter_state(), VoterState::Unregistered);

        session.credential = Some("CRED-1".to_string());
        assert_eq!(session.voter_state(), VoterState::Registered);

        session.has_voted = true;
        assert_eq!(session.voter_state(), VoterState::Voted);
    }

    #[test]
    fn list_field_ignores_non_arrays() {
        let body = json!({ "candidates": "nope" });
        let list: Vec<Candidate> = list_field(&body, "candidates");
        assert!(list.is_empty());

        let list: Vec<Candidate> = list_field(&json!({}), "candidates");
        assert!(list.is_empty());
    }

    #[test]
    fn result_rows_tolerate_missing_fields() {
        let body = json!({ "results": [{ "id": 3 }, { "id": 1, "name": "A", "votes": 10 }] });
        let rows: Vec<ResultRow> = list_field(&body, "results");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].cells(), ["3".to_string(), String::new(), String::new()]);
        assert_eq!(rows[1], ResultRow::new(1, "A", 10));
    }

    #[test]
    fn result_cells_accept_any_json_type() {
        let body = json!({ "results": [{ "id": "1", "name": "A", "votes": "10" }, { "id": 2, "name": null, "votes": 3.5 }] });
        let rows: Vec<ResultRow> = list_field(&body, "results");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].cells(), ["1".to_string(), "A".to_string(), "10".to_string()]);
        assert_eq!(rows[1].cells(), ["2".to_string(), String::new(), "3.5".to_string()]);
    }

    #[test]
    fn mistyped_candidates_are_skipped() {
        let body = json!({ "candidates": [{ "id": "x", "name": "A" }, { "id": 2, "name": "B" }] });
        let list: Vec<Candidate> = list_field(&body, "candidates");
        assert_eq!(list, vec![Candidate { id: 2, name: "B".to_string() }]);
    }

    #[test]
    fn lenient_decode_defaults_on_mismatch() {
        let resp: RegisterResponse = lenient(json!({ "is_eligible": "yes" }));
        assert!(!resp.is_eligible);
        assert!(resp.voting_credential.is_none());
    }
}
