//! Member listings, profile pages and profile edits.

use std::{collections::HashMap, sync::Arc};

use indexmap::IndexSet;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    dao::{
        jam_store::JamStore,
        models::{ProfileEntity, UserEntity},
        query::{PageRequest, TimeBucket, UserFilter},
    },
    dto::{
        tag::TagView,
        user::{
            ListUsersQuery, UpdateUserRequest, UserDetail, UserListItem, UserRef, UsersPage,
            handle_of,
        },
    },
    error::ServiceError,
    services::gamejam_service::{expand_game_jams, users_by_id},
    state::SharedState,
};

/// Return one page of onboarded users ordered by id.
pub async fn list_users(
    state: &SharedState,
    query: ListUsersQuery,
) -> Result<UsersPage, ServiceError> {
    let store = state.require_jam_store().await?;
    let page = PageRequest {
        limit: query
            .limit
            .unwrap_or_else(|| state.config().users_page_size()),
        cursor: query.cursor,
    };

    let page = store.find_users(UserFilter::new(query.q), page).await?;
    let users = page
        .items
        .into_iter()
        .filter_map(|user| {
            let username = user.profile?.username;
            Some(UserListItem {
                id: user.id,
                name: user.name,
                image: user.image,
                skill_level: user.skill_level,
                handle: handle_of(&username),
                username,
            })
        })
        .collect();

    Ok(UsersPage {
        users,
        next_cursor: page.next_cursor,
        count: page.count,
    })
}

/// Profile page of the user with the given id.
pub async fn get_user(state: &SharedState, id: Uuid) -> Result<UserDetail, ServiceError> {
    let store = state.require_jam_store().await?;
    let user = store
        .find_user(id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("user {id} not found")))?;
    build_detail(state, &store, user, false).await
}

/// Profile page of the user owning `username`.
pub async fn get_user_by_username(
    state: &SharedState,
    username: String,
) -> Result<UserDetail, ServiceError> {
    let store = state.require_jam_store().await?;
    let user = store
        .find_user_by_username(username.clone())
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("user @{username} not found")))?;
    build_detail(state, &store, user, false).await
}

/// Profile page of the authenticated caller, including their email.
pub async fn get_me(state: &SharedState, caller: Uuid) -> Result<UserDetail, ServiceError> {
    let store = state.require_jam_store().await?;
    let user = store
        .find_user(caller)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("user {caller} not found")))?;
    build_detail(state, &store, user, true).await
}

/// Apply a profile patch to the caller's own account.
pub async fn update_user(
    state: &SharedState,
    caller: Uuid,
    id: Uuid,
    patch: UpdateUserRequest,
) -> Result<UserDetail, ServiceError> {
    if caller != id {
        return Err(ServiceError::Forbidden(format!(
            "user {caller} cannot edit user {id}"
        )));
    }

    let store = state.require_jam_store().await?;
    let mut user = store
        .find_user(id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("user {id} not found")))?;

    if let Some(name) = patch.name {
        user.name = Some(name);
    }
    if let Some(image) = patch.image {
        user.image = Some(image);
    }
    if let Some(skill_level) = patch.skill_level {
        user.skill_level = skill_level;
    }
    if let Some(tags) = patch.tags {
        user.tag_ids = resolve_tags(&store, tags).await?;
    }

    if let Some(username) = &patch.username {
        let owner = store.find_user_by_username(username.clone()).await?;
        if owner.is_some_and(|owner| owner.id != id) {
            return Err(ServiceError::Conflict(format!(
                "username {username} is already taken"
            )));
        }
    }

    user.profile = match (user.profile.take(), patch.username, patch.bio) {
        (Some(mut profile), username, bio) => {
            if let Some(username) = username {
                profile.username = username;
            }
            if let Some(bio) = bio {
                profile.bio = Some(bio);
            }
            Some(profile)
        }
        (None, Some(username), bio) => Some(ProfileEntity { username, bio }),
        (None, None, _) => {
            return Err(ServiceError::InvalidInput(
                "username is required to create a profile".into(),
            ));
        }
    };

    store.save_user(user.clone()).await?;
    info!(user_id = %id, "user profile updated");
    build_detail(state, &store, user, true).await
}

/// Deduplicate tag ids and reject the ones that do not exist.
async fn resolve_tags(
    store: &Arc<dyn JamStore>,
    tags: Vec<Uuid>,
) -> Result<Vec<Uuid>, ServiceError> {
    let requested: IndexSet<Uuid> = tags.into_iter().collect();
    if requested.is_empty() {
        return Ok(Vec::new());
    }

    let known: IndexSet<Uuid> = store
        .find_tags(requested.iter().copied().collect())
        .await?
        .into_iter()
        .map(|tag| tag.id)
        .collect();
    let unknown: Vec<String> = requested
        .iter()
        .filter(|id| !known.contains(*id))
        .map(Uuid::to_string)
        .collect();

    if unknown.is_empty() {
        Ok(requested.into_iter().collect())
    } else {
        Err(ServiceError::InvalidInput(format!(
            "unknown tags: {}",
            unknown.join(", ")
        )))
    }
}

async fn build_detail(
    state: &SharedState,
    store: &Arc<dyn JamStore>,
    user: UserEntity,
    include_email: bool,
) -> Result<UserDetail, ServiceError> {
    let Some(profile) = user.profile.clone() else {
        return Err(ServiceError::OnboardingRequired(format!(
            "user {} has no profile",
            user.id
        )));
    };

    let mut tags_by_id: HashMap<Uuid, _> = store
        .find_tags(user.tag_ids.clone())
        .await?
        .into_iter()
        .map(|tag| (tag.id, tag))
        .collect();
    let tags: Vec<TagView> = user
        .tag_ids
        .iter()
        .filter_map(|id| tags_by_id.remove(id))
        .map(Into::into)
        .collect();

    let connections = connections_of(store, user.id).await?;

    let mut jam_ids = IndexSet::new();
    for team in store.find_teams_by_member(user.id).await? {
        jam_ids.insert(team.game_jam_id);
    }
    let mut jams = store
        .find_game_jams_by_ids(jam_ids.into_iter().collect())
        .await?;
    jams.sort_by(|a, b| b.start_date.cmp(&a.start_date).then(a.id.cmp(&b.id)));

    let now = state.now();
    let mut current_game_jams = Vec::new();
    let mut previous_game_jams = Vec::new();
    let mut upcoming_game_jams = Vec::new();
    for jam in expand_game_jams(store, jams).await? {
        match TimeBucket::classify(jam.start_date, jam.end_date, now) {
            TimeBucket::Current => current_game_jams.push(jam),
            TimeBucket::Previous => previous_game_jams.push(jam),
            TimeBucket::Upcoming => upcoming_game_jams.push(jam),
        }
    }
    debug!(
        user_id = %user.id,
        current = current_game_jams.len(),
        previous = previous_game_jams.len(),
        upcoming = upcoming_game_jams.len(),
        "built user detail"
    );

    Ok(UserDetail {
        id: user.id,
        name: user.name,
        email: user.email.filter(|_| include_email),
        image: user.image,
        skill_level: user.skill_level,
        date_joined: user.date_joined,
        handle: handle_of(&profile.username),
        username: profile.username,
        bio: profile.bio,
        tags,
        connections,
        current_game_jams,
        previous_game_jams,
        upcoming_game_jams,
    })
}

/// Other parties of accepted requests, incoming first, each once, onboarded only.
async fn connections_of(
    store: &Arc<dyn JamStore>,
    user_id: Uuid,
) -> Result<Vec<UserRef>, ServiceError> {
    let requests = store.find_accepted_connections(user_id).await?;
    let (incoming, outgoing): (Vec<_>, Vec<_>) = requests
        .into_iter()
        .partition(|request| request.receiver_id == user_id);

    let parties: IndexSet<Uuid> = incoming
        .iter()
        .chain(outgoing.iter())
        .map(|request| request.counterpart(user_id))
        .filter(|party| *party != user_id)
        .collect();

    let users = users_by_id(store, parties.iter().copied()).await?;
    Ok(parties
        .iter()
        .filter_map(|id| users.get(id))
        .filter(|user| user.profile.is_some())
        .map(UserRef::from)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        clock::Clock,
        config::AppConfig,
        dao::{
            jam_store::memory::{MemoryJamStore, MemorySeed},
            models::{
                ConnectionRequestEntity, GameJamEntity, SkillLevel, TagCategoryEntity, TagEntity,
                TeamEntity,
            },
        },
        state::AppState,
    };
    use time::{OffsetDateTime, macros::datetime};

    const NOW: OffsetDateTime = datetime!(2024-01-02 12:00 UTC);

    fn id(n: u128) -> Uuid {
        Uuid::from_u128(n)
    }

    fn user(n: u128, name: &str, username: Option<&str>) -> UserEntity {
        UserEntity {
            id: id(n),
            name: Some(name.into()),
            email: Some(format!("{name}@example.com")),
            image: None,
            skill_level: SkillLevel::Intermediate,
            date_joined: datetime!(2023-06-01 00:00 UTC),
            profile: username.map(|username| ProfileEntity {
                username: username.into(),
                bio: None,
            }),
            tag_ids: Vec::new(),
        }
    }

    fn connection(n: u128, sender: u128, receiver: u128, accepted: bool) -> ConnectionRequestEntity {
        ConnectionRequestEntity {
            id: id(n),
            sender_id: id(sender),
            receiver_id: id(receiver),
            accepted,
        }
    }

    fn jam(n: u128, start: OffsetDateTime, end: OffsetDateTime) -> GameJamEntity {
        GameJamEntity {
            id: id(n),
            name: format!("Jam {n}"),
            description: String::new(),
            start_date: start,
            end_date: end,
            host_ids: vec![id(2)],
            created_at: start,
            updated_at: start,
        }
    }

    fn team(n: u128, jam: u128, members: &[u128]) -> TeamEntity {
        TeamEntity {
            id: id(n),
            name: format!("Team {n}"),
            game_jam_id: id(jam),
            member_ids: members.iter().copied().map(id).collect(),
        }
    }

    fn tag(n: u128, name: &str) -> TagEntity {
        TagEntity {
            id: id(n),
            name: name.into(),
            category: Some(TagCategoryEntity {
                id: id(900),
                name: "Engine".into(),
            }),
        }
    }

    fn state() -> SharedState {
        let seed = MemorySeed {
            users: vec![
                user(1, "Alice", Some("alice")),
                user(2, "Bob", Some("bob")),
                user(3, "Carol", Some("carol")),
                user(4, "Dave", None),
                user(5, "Eve", Some("eve")),
            ],
            tags: vec![tag(50, "Godot"), tag(51, "Unity")],
            connections: vec![
                connection(30, 1, 2, true),
                connection(31, 3, 1, true),
                connection(32, 1, 4, true),
                connection(33, 5, 1, false),
                connection(34, 2, 1, true),
            ],
            game_jams: vec![
                jam(10, datetime!(2024-01-01 00:00 UTC), datetime!(2024-01-03 00:00 UTC)),
                jam(11, datetime!(2023-11-01 00:00 UTC), datetime!(2023-11-03 00:00 UTC)),
                jam(12, datetime!(2024-03-01 00:00 UTC), datetime!(2024-03-03 00:00 UTC)),
            ],
            teams: vec![
                team(20, 10, &[1, 3]),
                team(21, 11, &[1]),
                team(22, 12, &[1, 2]),
                team(23, 12, &[1]),
            ],
            ..Default::default()
        };
        let clock = Clock::Fixed(NOW);
        AppState::with_store(
            AppConfig::default(),
            clock,
            Arc::new(MemoryJamStore::from_seed(seed, clock)),
        )
    }

    #[tokio::test]
    async fn list_excludes_users_without_profile() {
        let page = list_users(&state(), ListUsersQuery::default()).await.unwrap();

        assert_eq!(page.count, 4);
        assert!(page.users.iter().all(|user| user.id != id(4)));
        assert_eq!(page.users[0].handle, "@alice");
    }

    #[tokio::test]
    async fn list_follows_cursor_to_the_end() {
        let state = state();
        let mut cursor = None;
        let mut seen = Vec::new();
        loop {
            let query = ListUsersQuery {
                limit: Some(3),
                cursor,
                q: None,
            };
            let page = list_users(&state, query).await.unwrap();
            seen.extend(page.users.iter().map(|user| user.id));
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }
        assert_eq!(seen, vec![id(1), id(2), id(3), id(5)]);
    }

    #[tokio::test]
    async fn by_username_has_handle_and_bucketed_jams() {
        let detail = get_user_by_username(&state(), "alice".into()).await.unwrap();

        assert_eq!(detail.handle, "@alice");
        assert_eq!(detail.email, None);
        let ids = |jams: &[crate::dto::gamejam::GameJamDetail]| {
            jams.iter().map(|jam| jam.id).collect::<Vec<_>>()
        };
        assert_eq!(ids(&detail.current_game_jams), vec![id(10)]);
        assert_eq!(ids(&detail.previous_game_jams), vec![id(11)]);
        // Two teams in the same jam still list it once.
        assert_eq!(ids(&detail.upcoming_game_jams), vec![id(12)]);
        assert_eq!(detail.current_game_jams[0].teams[0].members.len(), 2);
        assert_eq!(detail.current_game_jams[0].hosts[0].handle.as_deref(), Some("@bob"));
    }

    #[tokio::test]
    async fn connections_are_incoming_first_deduplicated_and_onboarded() {
        let detail = get_user(&state(), id(1)).await.unwrap();

        let handles: Vec<_> = detail
            .connections
            .iter()
            .map(|user| user.handle.clone().unwrap_or_default())
            .collect();
        assert_eq!(handles, ["@carol", "@bob"]);
    }

    #[tokio::test]
    async fn user_without_profile_requires_onboarding() {
        let err = get_user(&state(), id(4)).await.unwrap_err();
        assert!(matches!(err, ServiceError::OnboardingRequired(_)));
    }

    #[tokio::test]
    async fn unknown_user_is_not_found() {
        let err = get_user_by_username(&state(), "nobody".into())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn me_includes_email() {
        let detail = get_me(&state(), id(1)).await.unwrap();
        assert_eq!(detail.email.as_deref(), Some("Alice@example.com"));
    }

    #[tokio::test]
    async fn update_is_idempotent() {
        let state = state();
        let patch = || UpdateUserRequest {
            name: Some("Alice Liddell".into()),
            tags: Some(vec![id(51), id(50), id(51)]),
            bio: Some("Pixel art".into()),
            ..Default::default()
        };

        let first = update_user(&state, id(1), id(1), patch()).await.unwrap();
        let second = update_user(&state, id(1), id(1), patch()).await.unwrap();

        let tag_names: Vec<_> = second.tags.iter().map(|tag| tag.name.as_str()).collect();
        assert_eq!(tag_names, ["Unity", "Godot"]);
        assert_eq!(first.name, second.name);
        assert_eq!(first.bio, second.bio);
        assert_eq!(second.bio.as_deref(), Some("Pixel art"));
    }

    #[tokio::test]
    async fn update_of_another_user_is_forbidden() {
        let err = update_user(&state(), id(2), id(1), UpdateUserRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
    }

    #[tokio::test]
    async fn taken_username_is_a_conflict() {
        let patch = UpdateUserRequest {
            username: Some("bob".into()),
            ..Default::default()
        };
        let err = update_user(&state(), id(1), id(1), patch).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn concurrent_claims_on_one_username_leave_a_single_owner() {
        let state = state();
        let claim = || UpdateUserRequest {
            username: Some("neo".into()),
            ..Default::default()
        };

        let (first, second) = tokio::join!(
            update_user(&state, id(1), id(1), claim()),
            update_user(&state, id(3), id(3), claim()),
        );
        let outcomes = [first, second];
        assert_eq!(outcomes.iter().filter(|outcome| outcome.is_ok()).count(), 1);
        assert!(
            outcomes
                .iter()
                .any(|outcome| matches!(outcome, Err(ServiceError::Conflict(_))))
        );

        let owner = get_user_by_username(&state, "neo".into()).await.unwrap();
        let winner = outcomes.iter().find_map(|outcome| outcome.as_ref().ok()).unwrap();
        assert_eq!(owner.id, winner.id);
    }

    #[tokio::test]
    async fn unknown_tags_are_rejected() {
        let patch = UpdateUserRequest {
            tags: Some(vec![id(50), id(77)]),
            ..Default::default()
        };
        let err = update_user(&state(), id(1), id(1), patch).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn onboarding_creates_profile_with_username() {
        let state = state();
        let err = update_user(&state, id(4), id(4), UpdateUserRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));

        let patch = UpdateUserRequest {
            username: Some("dave".into()),
            ..Default::default()
        };
        let detail = update_user(&state, id(4), id(4), patch).await.unwrap();
        assert_eq!(detail.handle, "@dave");
        assert_eq!(get_user_by_username(&state, "dave".into()).await.unwrap().id, id(4));
    }
}
