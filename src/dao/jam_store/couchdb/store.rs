use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, Method, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{from_value, json};
use tracing::warn;
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
        storage::StorageResult,
    },
};

use super::{
    config::CouchConfig,
    error::{CouchDaoError, CouchResult},
    models::{
        AllDocsResponse, CONNECTION_PREFIX, CouchDocument, END_SUFFIX, GAME_JAM_PREFIX,
        TAG_PREFIX, TEAM_PREFIX, USER_PREFIX, UsernameClaim, doc_id, released_username,
        session_doc_id, username_doc_id,
    },
};

const ALL_DOCS: &str = "_all_docs";

/// CouchDB-backed [`JamStore`]. Filtering and pagination happen in process.
#[derive(Clone)]
pub struct CouchJamStore {
    client: Client,
    base_url: Arc<str>,
    database: Arc<str>,
    auth: Option<(Arc<str>, Arc<str>)>,
}

impl CouchJamStore {
    /// Build the HTTP client and make sure the database exists.
    pub async fn connect(config: CouchConfig) -> CouchResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| CouchDaoError::ClientBuilder { source })?;

        let base_url = Arc::<str>::from(config.base_url.trim_end_matches('/'));
        let database = Arc::<str>::from(config.database);
        let auth = config
            .username
            .zip(config.password)
            .map(|(u, p)| (Arc::<str>::from(u), Arc::<str>::from(p)));

        let store = Self {
            client,
            base_url,
            database,
            auth,
        };

        store.ensure_database().await?;
        Ok(store)
    }

    fn with_auth(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.auth {
            Some((ref user, ref pass)) => builder.basic_auth(user.as_ref(), Some(pass.as_ref())),
            None => builder,
        }
    }

    fn database_url(&self) -> String {
        format!("{}/{}", self.base_url, self.database)
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{}", self.database_url(), path);
        self.with_auth(self.client.request(method, url))
    }

    async fn ensure_database(&self) -> CouchResult<()> {
        let database = self.database.to_string();
        let url = self.database_url();

        let response = self
            .with_auth(self.client.get(&url))
            .send()
            .await
            .map_err(|source| CouchDaoError::DatabaseQuery {
                database: database.clone(),
                source,
            })?;

        match response.status() {
            StatusCode::OK => Ok(()),
            StatusCode::NOT_FOUND => {
                let create = self
                    .with_auth(self.client.put(&url))
                    .send()
                    .await
                    .map_err(|source| CouchDaoError::DatabaseCreate {
                        database: database.clone(),
                        source,
                    })?;
                // 412 means another instance created it first.
                if create.status().is_success() || create.status() == StatusCode::PRECONDITION_FAILED
                {
                    Ok(())
                } else {
                    Err(CouchDaoError::DatabaseStatus {
                        database,
                        status: create.status(),
                    })
                }
            }
            other => Err(CouchDaoError::DatabaseStatus {
                database,
                status: other,
            }),
        }
    }

    async fn get_document<B>(&self, doc_id: &str) -> CouchResult<Option<CouchDocument<B>>>
    where
        B: DeserializeOwned,
    {
        let response = self
            .request(Method::GET, doc_id)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: doc_id.to_string(),
                source,
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => response
                .json::<CouchDocument<B>>()
                .await
                .map(Some)
                .map_err(|source| CouchDaoError::DecodeResponse {
                    path: doc_id.to_string(),
                    source,
                }),
            other => Err(CouchDaoError::RequestStatus {
                path: doc_id.to_string(),
                status: other,
            }),
        }
    }

    /// Insert or replace a document, carrying over the current revision.
    async fn save_document<B>(&self, doc_id: String, body: B) -> CouchResult<()>
    where
        B: Serialize + DeserializeOwned,
    {
        let mut document = CouchDocument::new(doc_id.clone(), body);
        if let Some(existing) = self.get_document::<B>(&doc_id).await? {
            document.rev = existing.rev;
        }

        let response = self
            .request(Method::PUT, &doc_id)
            .json(&document)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: doc_id.clone(),
                source,
            })?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(CouchDaoError::RequestStatus {
                path: doc_id,
                status: response.status(),
            })
        }
    }

    async fn all_docs<B>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> CouchResult<Vec<CouchDocument<B>>>
    where
        B: DeserializeOwned,
    {
        let response = request
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: ALL_DOCS.to_string(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(CouchDaoError::RequestStatus {
                path: ALL_DOCS.to_string(),
                status: response.status(),
            });
        }

        let payload = response.json::<AllDocsResponse>().await.map_err(|source| {
            CouchDaoError::DecodeResponse {
                path: ALL_DOCS.to_string(),
                source,
            }
        })?;

        payload
            .rows
            .into_iter()
            .filter_map(|row| row.doc)
            .filter(|doc| !doc.is_null())
            .map(|doc| {
                from_value::<CouchDocument<B>>(doc).map_err(|source| {
                    CouchDaoError::DeserializeValue {
                        path: ALL_DOCS.to_string(),
                        source,
                    }
                })
            })
            .collect()
    }

    /// Every document whose id starts with `prefix`.
    async fn list_documents<B>(&self, prefix: &str) -> CouchResult<Vec<B>>
    where
        B: DeserializeOwned,
    {
        let query = [
            ("include_docs", "true".to_string()),
            ("startkey", format!("\"{}\"", prefix)),
            ("endkey", format!("\"{}{}\"", prefix, END_SUFFIX)),
        ];
        let documents = self
            .all_docs(self.request(Method::GET, ALL_DOCS).query(&query))
            .await?;
        Ok(documents.into_iter().map(|document| document.body).collect())
    }

    /// Documents with the given ids, revision included; missing ones are skipped.
    ///
    /// Keys travel in the body, so ids need not be URL-safe.
    async fn fetch_full_documents<B>(
        &self,
        keys: Vec<String>,
    ) -> CouchResult<Vec<CouchDocument<B>>>
    where
        B: DeserializeOwned,
    {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        self.all_docs(
            self.request(Method::POST, ALL_DOCS)
                .query(&[("include_docs", "true")])
                .json(&json!({ "keys": keys })),
        )
        .await
    }

    /// Documents with the given ids; missing ones are skipped.
    async fn fetch_documents<B>(&self, keys: Vec<String>) -> CouchResult<Vec<B>>
    where
        B: DeserializeOwned,
    {
        let documents = self.fetch_full_documents(keys).await?;
        Ok(documents.into_iter().map(|document| document.body).collect())
    }

    async fn username_claim(
        &self,
        username: &str,
    ) -> CouchResult<Option<CouchDocument<UsernameClaim>>> {
        let documents = self
            .fetch_full_documents::<UsernameClaim>(vec![username_doc_id(username)])
            .await?;
        Ok(documents.into_iter().next())
    }

    /// Reserve `username` for `user_id`.
    ///
    /// The claim is created with a POST carrying no revision, so CouchDB answers
    /// 409 when the document already exists. A claim already held by the same
    /// user counts as success.
    async fn claim_username(&self, username: &str, user_id: Uuid) -> CouchResult<()> {
        let doc_id = username_doc_id(username);
        let document = CouchDocument::new(doc_id.clone(), UsernameClaim { user_id });

        let response = self
            .with_auth(self.client.post(self.database_url()))
            .json(&document)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: doc_id.clone(),
                source,
            })?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::CONFLICT => match self.username_claim(username).await? {
                Some(existing) if existing.body.user_id == user_id => Ok(()),
                _ => Err(CouchDaoError::UsernameTaken {
                    username: username.to_owned(),
                }),
            },
            other => Err(CouchDaoError::RequestStatus {
                path: doc_id,
                status: other,
            }),
        }
    }

    /// Drop the claim `user_id` holds on `username`, if any.
    async fn release_username(&self, username: &str, user_id: Uuid) -> CouchResult<()> {
        let Some(existing) = self.username_claim(username).await? else {
            return Ok(());
        };
        if existing.body.user_id != user_id {
            return Ok(());
        }
        let Some(rev) = existing.rev else {
            return Ok(());
        };

        let path = "_bulk_docs";
        let response = self
            .request(Method::POST, path)
            .json(&json!({ "docs": [{ "_id": existing.id, "_rev": rev, "_deleted": true }] }))
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: path.to_string(),
                source,
            })?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(CouchDaoError::RequestStatus {
                path: path.to_string(),
                status: response.status(),
            })
        }
    }

    /// Claim the new username, save the user, then release the username it gave up.
    async fn save_user_with_claim(&self, user: UserEntity) -> CouchResult<()> {
        let previous = self.find_by_id::<UserEntity>(USER_PREFIX, user.id).await?;
        let previous_username = previous
            .as_ref()
            .and_then(UserEntity::username)
            .map(str::to_owned);
        let next_username = user.username().map(str::to_owned);
        let user_id = user.id;

        if let Some(username) = next_username.as_deref() {
            self.claim_username(username, user_id).await?;
        }
        self.save_document(doc_id(USER_PREFIX, user_id), user).await?;

        let released = released_username(previous_username.as_deref(), next_username.as_deref());
        if let Some(old) = released {
            // The user is saved; a stale claim only blocks reuse of the old name.
            if let Err(err) = self.release_username(old, user_id).await {
                warn!(username = old, error = %err, "failed to release username claim");
            }
        }
        Ok(())
    }

    async fn find_by_ids<B>(&self, prefix: &str, ids: Vec<Uuid>) -> CouchResult<Vec<B>>
    where
        B: DeserializeOwned,
    {
        let keys = ids.into_iter().map(|id| doc_id(prefix, id)).collect();
        self.fetch_documents(keys).await
    }

    async fn find_by_id<B>(&self, prefix: &str, id: Uuid) -> CouchResult<Option<B>>
    where
        B: DeserializeOwned,
    {
        Ok(self
            .get_document::<B>(&doc_id(prefix, id))
            .await?
            .map(|document| document.body))
    }
}

impl JamStore for CouchJamStore {
    fn find_users(
        &self,
        filter: UserFilter,
        page: PageRequest,
    ) -> BoxFuture<'static, StorageResult<Page<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let users = store.list_documents::<UserEntity>(USER_PREFIX).await?;
            Ok(paginate_users(users, &filter, page))
        })
    }

    fn find_user(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.find_by_id(USER_PREFIX, id).await?) })
    }

    fn find_user_by_username(
        &self,
        username: String,
    ) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            if let Some(claim) = store.username_claim(&username).await? {
                let owner = store
                    .find_by_id::<UserEntity>(USER_PREFIX, claim.body.user_id)
                    .await?;
                let owner = owner.filter(|user| user.username() == Some(username.as_str()));
                if owner.is_some() {
                    return Ok(owner);
                }
            }
            // Users saved before claims existed are only found by scanning.
            let users = store.list_documents::<UserEntity>(USER_PREFIX).await?;
            Ok(users
                .into_iter()
                .find(|user| user.username() == Some(username.as_str())))
        })
    }

    fn find_users_by_ids(
        &self,
        ids: Vec<Uuid>,
    ) -> BoxFuture<'static, StorageResult<Vec<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.find_by_ids(USER_PREFIX, ids).await?) })
    }

    fn save_user(&self, user: UserEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_user_with_claim(user).await.map_err(Into::into) })
    }

    fn list_tags(&self) -> BoxFuture<'static, StorageResult<Vec<TagEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.list_documents(TAG_PREFIX).await?) })
    }

    fn find_tags(&self, ids: Vec<Uuid>) -> BoxFuture<'static, StorageResult<Vec<TagEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.find_by_ids(TAG_PREFIX, ids).await?) })
    }

    fn find_accepted_connections(
        &self,
        user_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<ConnectionRequestEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let requests = store
                .list_documents::<ConnectionRequestEntity>(CONNECTION_PREFIX)
                .await?;
            Ok(requests
                .into_iter()
                .filter(|request| {
                    request.accepted
                        && (request.sender_id == user_id || request.receiver_id == user_id)
                })
                .collect())
        })
    }

    fn find_teams_by_member(
        &self,
        user_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<TeamEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let teams = store.list_documents::<TeamEntity>(TEAM_PREFIX).await?;
            Ok(teams
                .into_iter()
                .filter(|team| team.member_ids.contains(&user_id))
                .collect())
        })
    }

    fn find_teams_by_game_jams(
        &self,
        game_jam_ids: Vec<Uuid>,
    ) -> BoxFuture<'static, StorageResult<Vec<TeamEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let teams = store.list_documents::<TeamEntity>(TEAM_PREFIX).await?;
            Ok(teams
                .into_iter()
                .filter(|team| game_jam_ids.contains(&team.game_jam_id))
                .collect())
        })
    }

    fn find_game_jams(
        &self,
        filter: GameJamFilter,
        page: PageRequest,
    ) -> BoxFuture<'static, StorageResult<Page<GameJamEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let jams = store.list_documents::<GameJamEntity>(GAME_JAM_PREFIX).await?;
            Ok(paginate_game_jams(jams, &filter, page, Clock::System.now()))
        })
    }

    fn find_game_jam(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameJamEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.find_by_id(GAME_JAM_PREFIX, id).await?) })
    }

    fn find_game_jams_by_ids(
        &self,
        ids: Vec<Uuid>,
    ) -> BoxFuture<'static, StorageResult<Vec<GameJamEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.find_by_ids(GAME_JAM_PREFIX, ids).await?) })
    }

    fn save_game_jam(&self, jam: GameJamEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .save_document(doc_id(GAME_JAM_PREFIX, jam.id), jam)
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
            // Looked up by key rather than by path: tokens are not URL-safe.
            let sessions = store
                .fetch_documents::<SessionEntity>(vec![session_doc_id(&token)])
                .await?;
            Ok(sessions.into_iter().next())
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let url = store.database_url();
            let response = store
                .with_auth(store.client.get(&url))
                .send()
                .await
                .map_err(|source| CouchDaoError::RequestSend {
                    path: url.clone(),
                    source,
                })?;

            if response.status().is_success() {
                Ok(())
            } else {
                Err(CouchDaoError::RequestStatus {
                    path: url,
                    status: response.status(),
                }
                .into())
            }
        })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ensure_database().await.map_err(Into::into) })
    }
}
