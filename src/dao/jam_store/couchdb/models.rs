use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

pub const USER_PREFIX: &str = "user::";
pub const TAG_PREFIX: &str = "tag::";
pub const CONNECTION_PREFIX: &str = "connection::";
pub const GAME_JAM_PREFIX: &str = "gamejam::";
pub const TEAM_PREFIX: &str = "team::";
pub const SESSION_PREFIX: &str = "session::";
pub const USERNAME_PREFIX: &str = "username::";
pub const END_SUFFIX: &str = "\u{ffff}";

#[derive(Debug, Deserialize)]
pub struct AllDocsResponse {
    pub rows: Vec<AllDocsRow>,
}

/// Rows for missing keys carry an `error` and no document.
#[derive(Debug, Deserialize)]
pub struct AllDocsRow {
    #[serde(default)]
    pub doc: Option<Value>,
}

/// Every record type is stored as its entity flattened next to the CouchDB metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchDocument<B> {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    #[serde(flatten)]
    pub body: B,
}

impl<B> CouchDocument<B> {
    pub fn new(id: String, body: B) -> Self {
        Self {
            id,
            rev: None,
            body,
        }
    }
}

pub fn doc_id(prefix: &str, id: Uuid) -> String {
    format!("{prefix}{id}")
}

pub fn session_doc_id(token: &str) -> String {
    format!("{SESSION_PREFIX}{token}")
}

/// Marker document reserving a username; its id is unique per username.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UsernameClaim {
    pub user_id: Uuid,
}

pub fn username_doc_id(username: &str) -> String {
    format!("{USERNAME_PREFIX}{username}")
}

/// Username whose claim must be released after a save moved `previous` to `next`.
pub fn released_username<'a>(previous: Option<&'a str>, next: Option<&str>) -> Option<&'a str> {
    previous.filter(|old| Some(*old) != next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::models::TeamEntity;
    use serde_json::json;

    #[test]
    fn document_without_revision_omits_rev_field() {
        let team = TeamEntity {
            id: Uuid::from_u128(1),
            name: "Pixel Pushers".into(),
            game_jam_id: Uuid::from_u128(2),
            member_ids: vec![Uuid::from_u128(3)],
        };
        let document = CouchDocument::new(doc_id(TEAM_PREFIX, team.id), team);
        let value = serde_json::to_value(&document).unwrap();

        assert_eq!(value["_id"], json!(format!("team::{}", Uuid::from_u128(1))));
        assert!(value.get("_rev").is_none());
        assert_eq!(value["name"], json!("Pixel Pushers"));
    }

    #[test]
    fn document_body_is_read_next_to_metadata() {
        let value = json!({
            "_id": "team::00000000-0000-0000-0000-000000000001",
            "_rev": "3-abc",
            "id": "00000000-0000-0000-0000-000000000001",
            "name": "Night Owls",
            "game_jam_id": "00000000-0000-0000-0000-000000000002"
        });
        let document: CouchDocument<TeamEntity> = serde_json::from_value(value).unwrap();

        assert_eq!(document.rev.as_deref(), Some("3-abc"));
        assert_eq!(document.body.name, "Night Owls");
        assert!(document.body.member_ids.is_empty());
    }

    #[test]
    fn session_ids_embed_token() {
        assert_eq!(session_doc_id("tok"), "session::tok");
    }

    #[test]
    fn username_claim_is_keyed_by_username() {
        let document = CouchDocument::new(
            username_doc_id("ada"),
            UsernameClaim {
                user_id: Uuid::from_u128(1),
            },
        );
        let value = serde_json::to_value(&document).unwrap();

        assert_eq!(value["_id"], json!("username::ada"));
        assert_eq!(value["user_id"], json!(Uuid::from_u128(1).to_string()));
        assert!(value.get("_rev").is_none());
    }

    #[test]
    fn only_a_changed_or_dropped_username_is_released() {
        assert_eq!(released_username(Some("ada"), Some("grace")), Some("ada"));
        assert_eq!(released_username(Some("ada"), None), Some("ada"));
        assert_eq!(released_username(Some("ada"), Some("ada")), None);
        assert_eq!(released_username(None, Some("ada")), None);
    }
}
