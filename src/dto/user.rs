use serde::{Deserialize, Serialize};
use serde_with::{NoneAsEmptyString, serde_as};
use time::OffsetDateTime;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::{SkillLevel, UserEntity},
    dto::{gamejam::GameJamDetail, tag::TagView, validation::validate_username},
};

/// Query string of `GET /users`.
#[serde_as]
#[derive(Debug, Default, Deserialize, IntoParams, Validate)]
#[into_params(parameter_in = Query)]
pub struct ListUsersQuery {
    /// Page size, 1 to 100. Defaults to the configured page size.
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<usize>,
    /// `next_cursor` of the previous page. Empty means first page.
    #[serde(default)]
    #[serde_as(as = "NoneAsEmptyString")]
    #[param(value_type = Option<String>)]
    pub cursor: Option<Uuid>,
    /// Case-insensitive substring of the user's name.
    pub q: Option<String>,
}

/// Compact reference to a user, used for hosts, team members and connections.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
pub struct UserRef {
    /// Identifier of the user.
    pub id: Uuid,
    /// Display name.
    pub name: Option<String>,
    /// Avatar URL.
    pub image: Option<String>,
    /// Absent until the user completes onboarding.
    pub username: Option<String>,
    /// `@username`, absent with the username.
    pub handle: Option<String>,
}

impl From<&UserEntity> for UserRef {
    fn from(user: &UserEntity) -> Self {
        let username = user.username().map(str::to_owned);
        Self {
            id: user.id,
            name: user.name.clone(),
            image: user.image.clone(),
            handle: username.as_deref().map(handle_of),
            username,
        }
    }
}

/// Entry of `GET /users`.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserListItem {
    /// Identifier of the user.
    pub id: Uuid,
    /// Display name.
    pub name: Option<String>,
    /// Avatar URL.
    pub image: Option<String>,
    /// Self-assessed skill level.
    pub skill_level: SkillLevel,
    /// Profile username.
    pub username: String,
    /// `@username`.
    pub handle: String,
}

/// Response of `GET /users`.
#[derive(Debug, Serialize, ToSchema)]
pub struct UsersPage {
    /// Users of this page, by id ascending.
    pub users: Vec<UserListItem>,
    /// Cursor of the next page; absent on the last page.
    pub next_cursor: Option<Uuid>,
    /// Number of users matching the filter across all pages.
    pub count: u64,
}

/// Profile page of a user with connections and game jams split by time bucket.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserDetail {
    /// Identifier of the user.
    pub id: Uuid,
    /// Display name.
    pub name: Option<String>,
    /// Only returned to the user themselves.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Avatar URL.
    pub image: Option<String>,
    /// Self-assessed skill level.
    pub skill_level: SkillLevel,
    /// Account creation time.
    #[serde(with = "time::serde::rfc3339")]
    pub date_joined: OffsetDateTime,
    /// Profile username.
    pub username: String,
    /// `@username`.
    pub handle: String,
    /// Free-form biography.
    pub bio: Option<String>,
    /// Tags in the order the user picked them.
    pub tags: Vec<TagView>,
    /// Accepted connections, incoming first.
    pub connections: Vec<UserRef>,
    /// Jams of the user's teams running now.
    pub current_game_jams: Vec<GameJamDetail>,
    /// Jams of the user's teams already over.
    pub previous_game_jams: Vec<GameJamDetail>,
    /// Jams of the user's teams not started yet.
    pub upcoming_game_jams: Vec<GameJamDetail>,
}

/// Patch applied by `PUT /users/{id}`. Omitted fields are left unchanged.
#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
pub struct UpdateUserRequest {
    /// New display name.
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    /// Avatar URL.
    #[validate(url)]
    pub image: Option<String>,
    /// New skill level.
    pub skill_level: Option<SkillLevel>,
    /// Replaces the whole tag set.
    pub tags: Option<Vec<Uuid>>,
    /// Required when the user has no profile yet.
    #[validate(custom(function = "validate_username"))]
    pub username: Option<String>,
    /// New biography, up to 500 characters.
    #[validate(length(max = 500))]
    pub bio: Option<String>,
}

/// `@` followed by the username.
pub fn handle_of(username: &str) -> String {
    format!("@{username}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_cursor_reads_as_first_page() {
        let query: ListUsersQuery = serde_json::from_str(r#"{"cursor": ""}"#).unwrap();
        assert_eq!(query.cursor, None);

        let query: ListUsersQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.cursor, None);
    }

    #[test]
    fn limit_is_bounded() {
        let query = ListUsersQuery {
            limit: Some(101),
            ..Default::default()
        };
        assert!(query.validate().is_err());

        let query = ListUsersQuery {
            limit: Some(100),
            ..Default::default()
        };
        assert!(query.validate().is_ok());
    }

    #[test]
    fn patch_rejects_invalid_username_and_image() {
        let patch = UpdateUserRequest {
            username: Some("a b".into()),
            image: Some("not a url".into()),
            ..Default::default()
        };
        let errors = patch.validate().unwrap_err();
        let fields = errors.field_errors();

        assert!(fields.contains_key("username"));
        assert!(fields.contains_key("image"));
    }

    #[test]
    fn handle_is_prefixed_username() {
        assert_eq!(handle_of("alice"), "@alice");
    }
}
