use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::dao::models::{TagCategoryEntity, TagEntity};

/// Tag category shown next to a tag.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
pub struct TagCategoryView {
    /// Identifier of the category.
    pub id: Uuid,
    /// Category label.
    pub name: String,
}

/// Tag with its category.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
pub struct TagView {
    /// Identifier of the tag.
    pub id: Uuid,
    /// Tag label.
    pub name: String,
    /// Category, if the tag has one.
    pub category: Option<TagCategoryView>,
}

impl From<TagCategoryEntity> for TagCategoryView {
    fn from(value: TagCategoryEntity) -> Self {
        Self {
            id: value.id,
            name: value.name,
        }
    }
}

impl From<TagEntity> for TagView {
    fn from(value: TagEntity) -> Self {
        Self {
            id: value.id,
            name: value.name,
            category: value.category.map(Into::into),
        }
    }
}

/// Response of `GET /tags`.
#[derive(Debug, Serialize, ToSchema)]
pub struct TagsResponse {
    /// Every tag, grouped by category.
    pub tags: Vec<TagView>,
}
