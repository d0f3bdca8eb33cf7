use crate::{
    dao::models::TagEntity, dto::tag::TagsResponse, error::ServiceError, state::SharedState,
};

/// Every tag, grouped by category name then ordered by tag name. Uncategorized tags come last.
pub async fn list_tags(state: &SharedState) -> Result<TagsResponse, ServiceError> {
    let store = state.require_jam_store().await?;
    let mut tags = store.list_tags().await?;
    tags.sort_by(|a, b| sort_key(a).cmp(&sort_key(b)));

    Ok(TagsResponse {
        tags: tags.into_iter().map(Into::into).collect(),
    })
}

fn sort_key(tag: &TagEntity) -> (bool, Option<&str>, &str) {
    let category = tag.category.as_ref().map(|category| category.name.as_str());
    (category.is_none(), category, tag.name.as_str())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use uuid::Uuid;

    use super::*;
    use crate::{
        clock::Clock,
        config::AppConfig,
        dao::{
            jam_store::memory::{MemoryJamStore, MemorySeed},
            models::TagCategoryEntity,
        },
        state::AppState,
    };

    fn tag(n: u128, name: &str, category: Option<&str>) -> TagEntity {
        TagEntity {
            id: Uuid::from_u128(n),
            name: name.into(),
            category: category.map(|name| TagCategoryEntity {
                id: Uuid::from_u128(name.len() as u128),
                name: name.into(),
            }),
        }
    }

    #[tokio::test]
    async fn tags_are_sorted_by_category_then_name() {
        let seed = MemorySeed {
            tags: vec![
                tag(1, "Unity", Some("Engine")),
                tag(2, "Artist", Some("Role")),
                tag(3, "Godot", Some("Engine")),
                tag(4, "Chill", None),
            ],
            ..Default::default()
        };
        let state = AppState::with_store(
            AppConfig::default(),
            Clock::System,
            Arc::new(MemoryJamStore::from_seed(seed, Clock::System)),
        );

        let names: Vec<_> = list_tags(&state)
            .await
            .unwrap()
            .tags
            .into_iter()
            .map(|tag| tag.name)
            .collect();
        assert_eq!(names, ["Godot", "Unity", "Artist", "Chill"]);
    }
}
