use std::time::SystemTime;

use mongodb::bson::{self, DateTime, Document, doc};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::dao::{
    models::{
        ConnectionRequestEntity, GameJamEntity, ProfileEntity, SessionEntity, SkillLevel,
        TagCategoryEntity, TagEntity, TeamEntity, UserEntity,
    },
    query::{GameJamFilter, TimeFrame, UserFilter},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoUserDocument {
    #[serde(rename = "_id")]
    id: bson::Uuid,
    name: Option<String>,
    email: Option<String>,
    image: Option<String>,
    #[serde(default)]
    skill_level: SkillLevel,
    date_joined: DateTime,
    profile: Option<ProfileEntity>,
    #[serde(default)]
    tag_ids: Vec<bson::Uuid>,
}

impl From<UserEntity> for MongoUserDocument {
    fn from(value: UserEntity) -> Self {
        Self {
            id: to_bson_uuid(value.id),
            name: value.name,
            email: value.email,
            image: value.image,
            skill_level: value.skill_level,
            date_joined: to_bson_datetime(value.date_joined),
            profile: value.profile,
            tag_ids: value.tag_ids.into_iter().map(to_bson_uuid).collect(),
        }
    }
}

impl From<MongoUserDocument> for UserEntity {
    fn from(value: MongoUserDocument) -> Self {
        Self {
            id: from_bson_uuid(value.id),
            name: value.name,
            email: value.email,
            image: value.image,
            skill_level: value.skill_level,
            date_joined: from_bson_datetime(value.date_joined),
            profile: value.profile,
            tag_ids: value.tag_ids.into_iter().map(from_bson_uuid).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoTagCategory {
    id: bson::Uuid,
    name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoTagDocument {
    #[serde(rename = "_id")]
    id: bson::Uuid,
    name: String,
    category: Option<MongoTagCategory>,
}

impl From<MongoTagDocument> for TagEntity {
    fn from(value: MongoTagDocument) -> Self {
        Self {
            id: from_bson_uuid(value.id),
            name: value.name,
            category: value.category.map(|category| TagCategoryEntity {
                id: from_bson_uuid(category.id),
                name: category.name,
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoConnectionDocument {
    #[serde(rename = "_id")]
    id: bson::Uuid,
    sender_id: bson::Uuid,
    receiver_id: bson::Uuid,
    accepted: bool,
}

impl From<MongoConnectionDocument> for ConnectionRequestEntity {
    fn from(value: MongoConnectionDocument) -> Self {
        Self {
            id: from_bson_uuid(value.id),
            sender_id: from_bson_uuid(value.sender_id),
            receiver_id: from_bson_uuid(value.receiver_id),
            accepted: value.accepted,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoGameJamDocument {
    #[serde(rename = "_id")]
    id: bson::Uuid,
    name: String,
    #[serde(default)]
    description: String,
    start_date: DateTime,
    end_date: DateTime,
    #[serde(default)]
    host_ids: Vec<bson::Uuid>,
    created_at: DateTime,
    updated_at: DateTime,
}

impl MongoGameJamDocument {
    pub fn start_date(&self) -> DateTime {
        self.start_date
    }
}

impl From<GameJamEntity> for MongoGameJamDocument {
    fn from(value: GameJamEntity) -> Self {
        Self {
            id: to_bson_uuid(value.id),
            name: value.name,
            description: value.description,
            start_date: to_bson_datetime(value.start_date),
            end_date: to_bson_datetime(value.end_date),
            host_ids: value.host_ids.into_iter().map(to_bson_uuid).collect(),
            created_at: to_bson_datetime(value.created_at),
            updated_at: to_bson_datetime(value.updated_at),
        }
    }
}

impl From<MongoGameJamDocument> for GameJamEntity {
    fn from(value: MongoGameJamDocument) -> Self {
        Self {
            id: from_bson_uuid(value.id),
            name: value.name,
            description: value.description,
            start_date: from_bson_datetime(value.start_date),
            end_date: from_bson_datetime(value.end_date),
            host_ids: value.host_ids.into_iter().map(from_bson_uuid).collect(),
            created_at: from_bson_datetime(value.created_at),
            updated_at: from_bson_datetime(value.updated_at),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoTeamDocument {
    #[serde(rename = "_id")]
    id: bson::Uuid,
    name: String,
    game_jam_id: bson::Uuid,
    #[serde(default)]
    member_ids: Vec<bson::Uuid>,
}

impl From<MongoTeamDocument> for TeamEntity {
    fn from(value: MongoTeamDocument) -> Self {
        Self {
            id: from_bson_uuid(value.id),
            name: value.name,
            game_jam_id: from_bson_uuid(value.game_jam_id),
            member_ids: value.member_ids.into_iter().map(from_bson_uuid).collect(),
        }
    }
}

/// Sessions are keyed by their token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoSessionDocument {
    #[serde(rename = "_id")]
    token: String,
    user_id: bson::Uuid,
    expires_at: DateTime,
}

impl From<MongoSessionDocument> for SessionEntity {
    fn from(value: MongoSessionDocument) -> Self {
        Self {
            token: value.token,
            user_id: from_bson_uuid(value.user_id),
            expires_at: from_bson_datetime(value.expires_at),
        }
    }
}

pub fn to_bson_uuid(id: Uuid) -> bson::Uuid {
    bson::Uuid::from_bytes(id.into_bytes())
}

pub fn from_bson_uuid(id: bson::Uuid) -> Uuid {
    Uuid::from_bytes(id.bytes())
}

pub fn to_bson_datetime(value: OffsetDateTime) -> DateTime {
    DateTime::from_system_time(SystemTime::from(value))
}

pub fn from_bson_datetime(value: DateTime) -> OffsetDateTime {
    OffsetDateTime::from(value.to_system_time())
}

pub fn doc_id(id: Uuid) -> Document {
    doc! {"_id": to_bson_uuid(id)}
}

pub fn ids_in(ids: Vec<Uuid>) -> Document {
    let ids: Vec<bson::Uuid> = ids.into_iter().map(to_bson_uuid).collect();
    doc! {"$in": ids}
}

/// Translate a [`UserFilter`] into a query document.
pub fn user_filter_document(filter: &UserFilter) -> Document {
    let mut query = doc! {"profile": {"$ne": null}};
    if let Some(needle) = &filter.name_contains {
        query.insert("name", name_pattern(needle));
    }
    query
}

/// Translate a [`GameJamFilter`] into a query document evaluated against the
/// server clock (`$$NOW`).
pub fn game_jam_filter_document(filter: &GameJamFilter) -> Document {
    let mut query = Document::new();
    if let Some(needle) = &filter.name_contains {
        query.insert("name", name_pattern(needle));
    }
    if let Some(clause) = time_frame_clause(filter.time_frame) {
        query.insert("$expr", clause);
    }
    query
}

/// Mirrors `TimeBucket::classify`: upcoming first, then previous, current otherwise.
fn time_frame_clause(time_frame: TimeFrame) -> Option<Document> {
    match time_frame {
        TimeFrame::All => None,
        TimeFrame::Current => Some(doc! {
            "$and": [
                {"$lte": ["$start_date", "$$NOW"]},
                {"$gte": ["$end_date", "$$NOW"]}
            ]
        }),
        TimeFrame::Previous => Some(doc! {
            "$and": [
                {"$lte": ["$start_date", "$$NOW"]},
                {"$lt": ["$end_date", "$$NOW"]}
            ]
        }),
        TimeFrame::Upcoming => Some(doc! {"$gt": ["$start_date", "$$NOW"]}),
    }
}

fn name_pattern(needle: &str) -> Document {
    doc! {"$regex": regex::escape(needle), "$options": "i"}
}
