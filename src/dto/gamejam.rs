use serde::{Deserialize, Serialize};
use serde_with::{NoneAsEmptyString, serde_as};
use time::OffsetDateTime;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::{models::GameJamEntity, query::TimeFrame},
    dto::{user::UserRef, validation::validate_date_range},
};

/// Query string of `GET /gamejams`.
#[serde_as]
#[derive(Debug, Default, Deserialize, IntoParams, Validate)]
#[into_params(parameter_in = Query)]
pub struct ListGameJamsQuery {
    /// Page size, 1 to 1000. Defaults to the configured page size.
    #[validate(range(min = 1, max = 1000))]
    pub limit: Option<usize>,
    /// `next_cursor` of the previous page. Empty means first page.
    #[serde(default)]
    #[serde_as(as = "NoneAsEmptyString")]
    #[param(value_type = Option<String>)]
    pub cursor: Option<Uuid>,
    /// Case-insensitive substring of the jam name.
    pub q: Option<String>,
    /// Time bucket to keep, `all` by default.
    #[serde(default)]
    pub time_frame: TimeFrame,
}

/// Team of a game jam with its members.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TeamView {
    /// Identifier of the team.
    pub id: Uuid,
    /// Team name.
    pub name: String,
    /// Members in registration order.
    pub members: Vec<UserRef>,
}

/// Entry of `GET /gamejams`.
#[derive(Debug, Serialize, ToSchema)]
pub struct GameJamListItem {
    /// Identifier of the game jam.
    pub id: Uuid,
    /// Game jam name.
    pub name: String,
    /// Description, empty when not provided.
    pub description: String,
    /// Opening time.
    #[serde(with = "time::serde::rfc3339")]
    pub start_date: OffsetDateTime,
    /// Closing time.
    #[serde(with = "time::serde::rfc3339")]
    pub end_date: OffsetDateTime,
    /// Hosting users.
    pub hosts: Vec<UserRef>,
    /// Number of registered teams.
    pub team_count: usize,
    /// Distinct members across all teams.
    pub participant_count: usize,
}

/// Response of `GET /gamejams`.
#[derive(Debug, Serialize, ToSchema)]
pub struct GameJamsPage {
    /// Jams of this page, newest start first.
    pub game_jams: Vec<GameJamListItem>,
    /// Cursor of the next page; absent on the last page.
    pub next_cursor: Option<Uuid>,
    /// Number of jams matching the filter across all pages.
    pub count: u64,
}

/// Game jam with hosts and teams expanded to their members.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GameJamDetail {
    /// Identifier of the game jam.
    pub id: Uuid,
    /// Game jam name.
    pub name: String,
    /// Description, empty when not provided.
    pub description: String,
    /// Opening time.
    #[serde(with = "time::serde::rfc3339")]
    pub start_date: OffsetDateTime,
    /// Closing time.
    #[serde(with = "time::serde::rfc3339")]
    pub end_date: OffsetDateTime,
    /// Creation time.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Last save time.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    /// Hosting users.
    pub hosts: Vec<UserRef>,
    /// Teams ordered by name.
    pub teams: Vec<TeamView>,
}

/// Payload of `POST /gamejams`. A missing or empty `id` creates a new jam.
#[serde_as]
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[validate(schema(function = "validate_date_range"))]
pub struct SaveGameJamRequest {
    /// Jam to update; omit or leave empty to create one.
    #[serde(default)]
    #[serde_as(as = "NoneAsEmptyString")]
    #[schema(value_type = Option<String>)]
    pub id: Option<Uuid>,
    /// Game jam name.
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    /// Description; omitted means empty.
    pub description: Option<String>,
    /// Opening time, RFC 3339.
    #[serde(with = "time::serde::rfc3339")]
    pub start_date: OffsetDateTime,
    /// Closing time, RFC 3339, not before the start.
    #[serde(with = "time::serde::rfc3339")]
    pub end_date: OffsetDateTime,
}

/// Response of `POST /gamejams`.
#[derive(Debug, Serialize, ToSchema)]
pub struct SavedGameJam {
    /// Identifier of the game jam.
    pub id: Uuid,
    /// Game jam name.
    pub name: String,
    /// Description, empty when not provided.
    pub description: String,
    /// Opening time.
    #[serde(with = "time::serde::rfc3339")]
    pub start_date: OffsetDateTime,
    /// Closing time.
    #[serde(with = "time::serde::rfc3339")]
    pub end_date: OffsetDateTime,
    /// Identifiers of the hosting users.
    pub host_ids: Vec<Uuid>,
    /// Creation time.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Last save time.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<GameJamEntity> for SavedGameJam {
    fn from(jam: GameJamEntity) -> Self {
        Self {
            id: jam.id,
            name: jam.name,
            description: jam.description,
            start_date: jam.start_date,
            end_date: jam.end_date,
            host_ids: jam.host_ids,
            created_at: jam.created_at,
            updated_at: jam.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_id_means_create() {
        let request: SaveGameJamRequest = serde_json::from_str(
            r#"{"id": "", "name": "Jam", "start_date": "2024-01-01T00:00:00Z", "end_date": "2024-01-03T00:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(request.id, None);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn reversed_dates_fail_validation() {
        let request: SaveGameJamRequest = serde_json::from_str(
            r#"{"name": "Jam", "start_date": "2024-01-05T00:00:00Z", "end_date": "2024-01-03T00:00:00Z"}"#,
        )
        .unwrap();
        assert!(request.validate().is_err());
    }

    #[test]
    fn time_frame_defaults_to_all() {
        let query: ListGameJamsQuery = serde_json::from_str(r#"{"q": "ludum"}"#).unwrap();
        assert_eq!(query.time_frame, TimeFrame::All);
    }
}
