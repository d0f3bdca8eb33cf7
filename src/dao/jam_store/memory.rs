//! In-process [`JamStore`] used by tests and local development.

use std::{collections::HashMap, sync::Arc};

use futures::future::BoxFuture;
use serde::Deserialize;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    clock::Clock,
    dao::{
        jam_store::JamStore,
        models::{
            ConnectionRequestEntity, GameJamEntity, SessionEntity, TagEntity, TeamEntity,
            UserEntity,
        },
        query::{GameJamFilter, Page, PageRequest, UserFilter, paginate_game_jams, paginate_users},
        storage::{StorageError, StorageResult},
    },
};

/// Fixture describing the initial content of a [`MemoryJamStore`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MemorySeed {
    /// Members.
    pub users: Vec<UserEntity>,
    /// Tags with their categories.
    pub tags: Vec<TagEntity>,
    /// Connection requests, accepted or not.
    pub connections: Vec<ConnectionRequestEntity>,
    /// Game jams.
    pub game_jams: Vec<GameJamEntity>,
    /// Teams and their memberships.
    pub teams: Vec<TeamEntity>,
    /// Active sessions.
    pub sessions: Vec<SessionEntity>,
}

#[derive(Default)]
struct MemoryData {
    users: HashMap<Uuid, UserEntity>,
    tags: HashMap<Uuid, TagEntity>,
    connections: Vec<ConnectionRequestEntity>,
    game_jams: HashMap<Uuid, GameJamEntity>,
    teams: HashMap<Uuid, TeamEntity>,
    sessions: HashMap<String, SessionEntity>,
}

/// [`JamStore`] keeping every record in memory.
#[derive(Clone)]
pub struct MemoryJamStore {
    data: Arc<RwLock<MemoryData>>,
    clock: Clock,
}

impl MemoryJamStore {
    /// Empty store evaluating time frames with `clock`.
    pub fn new(clock: Clock) -> Self {
        Self::from_seed(MemorySeed::default(), clock)
    }

    /// Store pre-populated from a fixture.
    pub fn from_seed(seed: MemorySeed, clock: Clock) -> Self {
        let data = MemoryData {
            users: seed.users.into_iter().map(|user| (user.id, user)).collect(),
            tags: seed.tags.into_iter().map(|tag| (tag.id, tag)).collect(),
            connections: seed.connections,
            game_jams: seed.game_jams.into_iter().map(|jam| (jam.id, jam)).collect(),
            teams: seed.teams.into_iter().map(|team| (team.id, team)).collect(),
            sessions: seed
                .sessions
                .into_iter()
                .map(|session| (session.token.clone(), session))
                .collect(),
        };

        Self {
            data: Arc::new(RwLock::new(data)),
            clock,
        }
    }
}

impl JamStore for MemoryJamStore {
    fn find_users(
        &self,
        filter: UserFilter,
        page: PageRequest,
    ) -> BoxFuture<'static, StorageResult<Page<UserEntity>>> {
        let data = self.data.clone();
        Box::pin(async move {
            let users = data.read().await.users.values().cloned().collect();
            Ok(paginate_users(users, &filter, page))
        })
    }

    fn find_user(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
        let data = self.data.clone();
        Box::pin(async move { Ok(data.read().await.users.get(&id).cloned()) })
    }

    fn find_user_by_username(
        &self,
        username: String,
    ) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
        let data = self.data.clone();
        Box::pin(async move {
            let guard = data.read().await;
            Ok(guard
                .users
                .values()
                .find(|user| user.username() == Some(username.as_str()))
                .cloned())
        })
    }

    fn find_users_by_ids(
        &self,
        ids: Vec<Uuid>,
    ) -> BoxFuture<'static, StorageResult<Vec<UserEntity>>> {
        let data = self.data.clone();
        Box::pin(async move {
            let guard = data.read().await;
            Ok(ids
                .iter()
                .filter_map(|id| guard.users.get(id).cloned())
                .collect())
        })
    }

    fn save_user(&self, user: UserEntity) -> BoxFuture<'static, StorageResult<()>> {
        let data = self.data.clone();
        Box::pin(async move {
            let mut guard = data.write().await;
            if let Some(username) = user.username() {
                let taken = guard
                    .users
                    .values()
                    .any(|other| other.id != user.id && other.username() == Some(username));
                if taken {
                    return Err(StorageError::conflict(format!(
                        "username `{username}` is already taken"
                    )));
                }
            }
            guard.users.insert(user.id, user);
            Ok(())
        })
    }

    fn list_tags(&self) -> BoxFuture<'static, StorageResult<Vec<TagEntity>>> {
        let data = self.data.clone();
        Box::pin(async move { Ok(data.read().await.tags.values().cloned().collect()) })
    }

    fn find_tags(&self, ids: Vec<Uuid>) -> BoxFuture<'static, StorageResult<Vec<TagEntity>>> {
        let data = self.data.clone();
        Box::pin(async move {
            let guard = data.read().await;
            Ok(ids
                .iter()
                .filter_map(|id| guard.tags.get(id).cloned())
                .collect())
        })
    }

    fn find_accepted_connections(
        &self,
        user_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<ConnectionRequestEntity>>> {
        let data = self.data.clone();
        Box::pin(async move {
            let guard = data.read().await;
            Ok(guard
                .connections
                .iter()
                .filter(|request| {
                    request.accepted
                        && (request.sender_id == user_id || request.receiver_id == user_id)
                })
                .cloned()
                .collect())
        })
    }

    fn find_teams_by_member(
        &self,
        user_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<TeamEntity>>> {
        let data = self.data.clone();
        Box::pin(async move {
            let guard = data.read().await;
            Ok(guard
                .teams
                .values()
                .filter(|team| team.member_ids.contains(&user_id))
                .cloned()
                .collect())
        })
    }

    fn find_teams_by_game_jams(
        &self,
        game_jam_ids: Vec<Uuid>,
    ) -> BoxFuture<'static, StorageResult<Vec<TeamEntity>>> {
        let data = self.data.clone();
        Box::pin(async move {
            let guard = data.read().await;
            Ok(guard
                .teams
                .values()
                .filter(|team| game_jam_ids.contains(&team.game_jam_id))
                .cloned()
                .collect())
        })
    }

    fn find_game_jams(
        &self,
        filter: GameJamFilter,
        page: PageRequest,
    ) -> BoxFuture<'static, StorageResult<Page<GameJamEntity>>> {
        let data = self.data.clone();
        let now = self.clock.now();
        Box::pin(async move {
            let jams = data.read().await.game_jams.values().cloned().collect();
            Ok(paginate_game_jams(jams, &filter, page, now))
        })
    }

    fn find_game_jam(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameJamEntity>>> {
        let data = self.data.clone();
        Box::pin(async move { Ok(data.read().await.game_jams.get(&id).cloned()) })
    }

    fn find_game_jams_by_ids(
        &self,
        ids: Vec<Uuid>,
    ) -> BoxFuture<'static, StorageResult<Vec<GameJamEntity>>> {
        let data = self.data.clone();
        Box::pin(async move {
            let guard = data.read().await;
            Ok(ids
                .iter()
                .filter_map(|id| guard.game_jams.get(id).cloned())
                .collect())
        })
    }

    fn save_game_jam(&self, jam: GameJamEntity) -> BoxFuture<'static, StorageResult<()>> {
        let data = self.data.clone();
        Box::pin(async move {
            data.write().await.game_jams.insert(jam.id, jam);
            Ok(())
        })
    }

    fn find_session(
        &self,
        token: String,
    ) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>> {
        let data = self.data.clone();
        Box::pin(async move { Ok(data.read().await.sessions.get(&token).cloned()) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}
