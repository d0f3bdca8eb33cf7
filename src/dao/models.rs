use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::ToSchema;
use uuid::Uuid;

/// Self-assessed experience level displayed on a member's profile.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SkillLevel {
    /// First jams, still learning the tools.
    #[default]
    Beginner,
    /// Shipped a few jam games.
    Intermediate,
    /// Seasoned jammer.
    Advanced,
}

/// Public profile embedded in a user record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProfileEntity {
    /// Unique display username, rendered as `@username`.
    pub username: String,
    /// Free-form biography.
    pub bio: Option<String>,
}

/// Member account persisted by the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserEntity {
    /// Primary key of the user.
    pub id: Uuid,
    /// Display name supplied by the identity provider.
    pub name: Option<String>,
    /// Contact email supplied by the identity provider.
    pub email: Option<String>,
    /// Avatar URL.
    pub image: Option<String>,
    /// Self-assessed skill level.
    #[serde(default)]
    pub skill_level: SkillLevel,
    /// Account creation timestamp.
    #[serde(with = "time::serde::rfc3339")]
    pub date_joined: OffsetDateTime,
    /// Profile created during onboarding; absent until then.
    pub profile: Option<ProfileEntity>,
    /// Tags attached to the user, in display order.
    #[serde(default)]
    pub tag_ids: Vec<Uuid>,
}

impl UserEntity {
    /// Username of the embedded profile, if onboarding has been completed.
    pub fn username(&self) -> Option<&str> {
        self.profile.as_ref().map(|profile| profile.username.as_str())
    }
}

/// Grouping for tags (e.g. "Engine", "Role").
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TagCategoryEntity {
    /// Primary key of the category.
    pub id: Uuid,
    /// Category label.
    pub name: String,
}

/// Descriptive label attachable to users.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TagEntity {
    /// Primary key of the tag.
    pub id: Uuid,
    /// Tag label.
    pub name: String,
    /// Category the tag belongs to.
    pub category: Option<TagCategoryEntity>,
}

/// Connection request between two users.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConnectionRequestEntity {
    /// Primary key of the request.
    pub id: Uuid,
    /// User who sent the request.
    pub sender_id: Uuid,
    /// User who received the request.
    pub receiver_id: Uuid,
    /// Whether the receiver accepted the request.
    pub accepted: bool,
}

impl ConnectionRequestEntity {
    /// Return the party on the other side of the request from `user_id`.
    pub fn counterpart(&self, user_id: Uuid) -> Uuid {
        if self.sender_id == user_id {
            self.receiver_id
        } else {
            self.sender_id
        }
    }
}

/// Game jam persisted by the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameJamEntity {
    /// Primary key of the game jam.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Long description, empty when not provided.
    #[serde(default)]
    pub description: String,
    /// Moment the jam opens.
    #[serde(with = "time::serde::rfc3339")]
    pub start_date: OffsetDateTime,
    /// Moment the jam closes.
    #[serde(with = "time::serde::rfc3339")]
    pub end_date: OffsetDateTime,
    /// Users hosting the jam.
    #[serde(default)]
    pub host_ids: Vec<Uuid>,
    /// Creation timestamp.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Last time the jam was saved.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Team registered for a game jam, together with its memberships.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TeamEntity {
    /// Primary key of the team.
    pub id: Uuid,
    /// Team name.
    pub name: String,
    /// Game jam the team participates in.
    pub game_jam_id: Uuid,
    /// Members of the team.
    #[serde(default)]
    pub member_ids: Vec<Uuid>,
}

/// Authenticated session issued by the identity provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionEntity {
    /// Opaque bearer token.
    pub token: String,
    /// User the session belongs to.
    pub user_id: Uuid,
    /// Expiry of the session.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}
