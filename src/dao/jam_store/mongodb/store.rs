use std::sync::Arc;

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Client, Collection, Database, IndexModel,
    bson::{Document, doc},
    error::{Error as MongoError, ErrorKind, WriteFailure},
    options::IndexOptions,
};
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
    models::{
        MongoConnectionDocument, MongoGameJamDocument, MongoSessionDocument, MongoTagDocument,
        MongoTeamDocument, MongoUserDocument, doc_id, game_jam_filter_document, ids_in,
        to_bson_uuid, user_filter_document,
    },
};
use crate::dao::{
    jam_store::JamStore,
    models::{
        ConnectionRequestEntity, GameJamEntity, SessionEntity, TagEntity, TeamEntity, UserEntity,
    },
    query::{GameJamFilter, Page, PageRequest, UserFilter},
    storage::StorageResult,
};

const USERS: &str = "users";
const TAGS: &str = "tags";
const CONNECTIONS: &str = "connection_requests";
const GAME_JAMS: &str = "game_jams";
const TEAMS: &str = "teams";
const SESSIONS: &str = "sessions";

/// MongoDB-backed [`JamStore`] implementation.
#[derive(Clone)]
pub struct MongoJamStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    // Kept so the connection pool lives as long as the database handle.
    _client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = self.state.read().await.database.clone();
        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        let mut guard = self.state.write().await;
        guard._client = client;
        guard.database = database;
        info!("MongoDB connection re-established");
        Ok(())
    }
}

impl MongoJamStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState {
                _client: client,
                database,
            }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let database = self.database().await;

        let username = IndexModel::builder()
            .keys(doc! {"profile.username": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("profile_username_idx".to_owned()))
                    .unique(Some(true))
                    .partial_filter_expression(Some(
                        doc! {"profile.username": {"$type": "string"}},
                    ))
                    .build(),
            )
            .build();
        create_index(&database, USERS, "profile.username", username).await?;

        let jam_order = IndexModel::builder()
            .keys(doc! {"start_date": -1, "_id": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("game_jam_order_idx".to_owned()))
                    .build(),
            )
            .build();
        create_index(&database, GAME_JAMS, "start_date,_id", jam_order).await?;

        let members = IndexModel::builder()
            .keys(doc! {"member_ids": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("team_members_idx".to_owned()))
                    .build(),
            )
            .build();
        create_index(&database, TEAMS, "member_ids", members).await?;

        let jam_teams = IndexModel::builder()
            .keys(doc! {"game_jam_id": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("team_game_jam_idx".to_owned()))
                    .build(),
            )
            .build();
        create_index(&database, TEAMS, "game_jam_id", jam_teams).await?;

        for (field, name) in [
            ("sender_id", "connection_sender_idx"),
            ("receiver_id", "connection_receiver_idx"),
        ] {
            let model = IndexModel::builder()
                .keys(doc! {field: 1})
                .options(IndexOptions::builder().name(Some(name.to_owned())).build())
                .build();
            create_index(&database, CONNECTIONS, field, model).await?;
        }

        Ok(())
    }

    async fn database(&self) -> Database {
        self.inner.state.read().await.database.clone()
    }

    async fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.database().await.collection::<T>(name)
    }

    async fn find_many<T>(
        &self,
        name: &'static str,
        filter: Document,
        sort: Option<Document>,
        limit: Option<i64>,
    ) -> MongoResult<Vec<T>>
    where
        T: DeserializeOwned + Unpin + Send + Sync,
    {
        let collection = self.collection::<T>(name).await;
        let mut action = collection.find(filter);
        if let Some(sort) = sort {
            action = action.sort(sort);
        }
        if let Some(limit) = limit {
            action = action.limit(limit);
        }

        action
            .await
            .map_err(|source| MongoDaoError::Query {
                collection: name,
                source,
            })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::Query {
                collection: name,
                source,
            })
    }

    async fn find_one<T>(&self, name: &'static str, filter: Document) -> MongoResult<Option<T>>
    where
        T: DeserializeOwned + Unpin + Send + Sync,
    {
        self.collection::<T>(name)
            .await
            .find_one(filter)
            .await
            .map_err(|source| MongoDaoError::Query {
                collection: name,
                source,
            })
    }

    async fn count(&self, name: &'static str, filter: Document) -> MongoResult<u64> {
        self.collection::<Document>(name)
            .await
            .count_documents(filter)
            .await
            .map_err(|source| MongoDaoError::Query {
                collection: name,
                source,
            })
    }

    async fn upsert<T>(&self, name: &'static str, id: Uuid, document: T) -> MongoResult<()>
    where
        T: serde::Serialize + Send + Sync,
    {
        self.collection::<T>(name)
            .await
            .replace_one(doc_id(id), &document)
            .upsert(true)
            .await
            .map_err(|source| {
                if is_duplicate_key(&source) {
                    MongoDaoError::DuplicateKey {
                        collection: name,
                        id: id.to_string(),
                    }
                } else {
                    MongoDaoError::Save {
                        collection: name,
                        id: id.to_string(),
                        source,
                    }
                }
            })?;
        Ok(())
    }

    async fn find_users(&self, filter: UserFilter, page: PageRequest) -> MongoResult<Page<UserEntity>> {
        let query = user_filter_document(&filter);
        let count = self.count(USERS, query.clone()).await?;

        let window = match page.cursor {
            Some(cursor) => {
                let anchor: Option<MongoUserDocument> = self.find_one(USERS, doc_id(cursor)).await?;
                if anchor.is_none() {
                    return Ok(empty_page(count));
                }
                doc! {"$and": [query, {"_id": {"$gte": to_bson_uuid(cursor)}}]}
            }
            None => query,
        };

        let documents: Vec<MongoUserDocument> = self
            .find_many(USERS, window, Some(doc! {"_id": 1}), Some(overfetch(page.limit)))
            .await?;
        let users = documents.into_iter().map(UserEntity::from).collect();
        Ok(Page::from_overfetch(users, page.limit, count, |user: &UserEntity| user.id))
    }

    async fn find_game_jams(
        &self,
        filter: GameJamFilter,
        page: PageRequest,
    ) -> MongoResult<Page<GameJamEntity>> {
        let query = game_jam_filter_document(&filter);
        let count = self.count(GAME_JAMS, query.clone()).await?;

        let window = match page.cursor {
            Some(cursor) => {
                let anchor: Option<MongoGameJamDocument> =
                    self.find_one(GAME_JAMS, doc_id(cursor)).await?;
                let Some(anchor) = anchor else {
                    return Ok(empty_page(count));
                };
                let start = anchor.start_date();
                doc! {"$and": [query, {"$or": [
                    {"start_date": {"$lt": start}},
                    {"start_date": start, "_id": {"$gte": to_bson_uuid(cursor)}}
                ]}]}
            }
            None => query,
        };

        let documents: Vec<MongoGameJamDocument> = self
            .find_many(
                GAME_JAMS,
                window,
                Some(doc! {"start_date": -1, "_id": 1}),
                Some(overfetch(page.limit)),
            )
            .await?;
        let jams = documents.into_iter().map(GameJamEntity::from).collect();
        Ok(Page::from_overfetch(jams, page.limit, count, |jam: &GameJamEntity| jam.id))
    }
}

async fn create_index(
    database: &Database,
    collection: &'static str,
    index: &'static str,
    model: IndexModel,
) -> MongoResult<()> {
    database
        .collection::<Document>(collection)
        .create_index(model)
        .await
        .map_err(|source| MongoDaoError::EnsureIndex {
            collection,
            index,
            source,
        })?;
    Ok(())
}

fn overfetch(limit: usize) -> i64 {
    i64::try_from(limit.saturating_add(1)).unwrap_or(i64::MAX)
}

fn empty_page<T>(count: u64) -> Page<T> {
    Page {
        items: Vec::new(),
        next_cursor: None,
        count,
    }
}

const DUPLICATE_KEY_CODE: i32 = 11000;

/// Whether a write was rejected by a unique index.
fn is_duplicate_key(err: &MongoError) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write)) if write.code == DUPLICATE_KEY_CODE
    )
}

impl JamStore for MongoJamStore {
    fn find_users(
        &self,
        filter: UserFilter,
        page: PageRequest,
    ) -> BoxFuture<'static, StorageResult<Page<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_users(filter, page).await.map_err(Into::into) })
    }

    fn find_user(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let document: Option<MongoUserDocument> = store.find_one(USERS, doc_id(id)).await?;
            Ok(document.map(Into::into))
        })
    }

    fn find_user_by_username(
        &self,
        username: String,
    ) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let document: Option<MongoUserDocument> = store
                .find_one(USERS, doc! {"profile.username": username})
                .await?;
            Ok(document.map(Into::into))
        })
    }

    fn find_users_by_ids(
        &self,
        ids: Vec<Uuid>,
    ) -> BoxFuture<'static, StorageResult<Vec<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let documents: Vec<MongoUserDocument> = store
                .find_many(USERS, doc! {"_id": ids_in(ids)}, None, None)
                .await?;
            Ok(documents.into_iter().map(Into::into).collect())
        })
    }

    fn save_user(&self, user: UserEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let id = user.id;
            store
                .upsert(USERS, id, MongoUserDocument::from(user))
                .await
                .map_err(Into::into)
        })
    }

    fn list_tags(&self) -> BoxFuture<'static, StorageResult<Vec<TagEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let documents: Vec<MongoTagDocument> =
                store.find_many(TAGS, doc! {}, None, None).await?;
            Ok(documents.into_iter().map(Into::into).collect())
        })
    }

    fn find_tags(&self, ids: Vec<Uuid>) -> BoxFuture<'static, StorageResult<Vec<TagEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let documents: Vec<MongoTagDocument> = store
                .find_many(TAGS, doc! {"_id": ids_in(ids)}, None, None)
                .await?;
            Ok(documents.into_iter().map(Into::into).collect())
        })
    }

    fn find_accepted_connections(
        &self,
        user_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<ConnectionRequestEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let user = to_bson_uuid(user_id);
            let filter = doc! {
                "accepted": true,
                "$or": [{"sender_id": user}, {"receiver_id": user}]
            };
            let documents: Vec<MongoConnectionDocument> =
                store.find_many(CONNECTIONS, filter, None, None).await?;
            Ok(documents.into_iter().map(Into::into).collect())
        })
    }

    fn find_teams_by_member(
        &self,
        user_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<TeamEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let documents: Vec<MongoTeamDocument> = store
                .find_many(TEAMS, doc! {"member_ids": to_bson_uuid(user_id)}, None, None)
                .await?;
            Ok(documents.into_iter().map(Into::into).collect())
        })
    }

    fn find_teams_by_game_jams(
        &self,
        game_jam_ids: Vec<Uuid>,
    ) -> BoxFuture<'static, StorageResult<Vec<TeamEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let documents: Vec<MongoTeamDocument> = store
                .find_many(TEAMS, doc! {"game_jam_id": ids_in(game_jam_ids)}, None, None)
                .await?;
            Ok(documents.into_iter().map(Into::into).collect())
        })
    }

    fn find_game_jams(
        &self,
        filter: GameJamFilter,
        page: PageRequest,
    ) -> BoxFuture<'static, StorageResult<Page<GameJamEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_game_jams(filter, page).await.map_err(Into::into) })
    }

    fn find_game_jam(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameJamEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let document: Option<MongoGameJamDocument> =
                store.find_one(GAME_JAMS, doc_id(id)).await?;
            Ok(document.map(Into::into))
        })
    }

    fn find_game_jams_by_ids(
        &self,
        ids: Vec<Uuid>,
    ) -> BoxFuture<'static, StorageResult<Vec<GameJamEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let documents: Vec<MongoGameJamDocument> = store
                .find_many(GAME_JAMS, doc! {"_id": ids_in(ids)}, None, None)
                .await?;
            Ok(documents.into_iter().map(Into::into).collect())
        })
    }

    fn save_game_jam(&self, jam: GameJamEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let id = jam.id;
            store
                .upsert(GAME_JAMS, id, MongoGameJamDocument::from(jam))
                .await
                .map_err(Into::into)
        })
    }

    fn find_session(
        &self,
        token: String,
    ) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let document: Option<MongoSessionDocument> =
                store.find_one(SESSIONS, doc! {"_id": token}).await?;
            Ok(document.map(Into::into))
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
