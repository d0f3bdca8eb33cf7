/// CouchDB backend.
#[cfg(feature = "couch-store")]
pub mod couchdb;
/// In-memory backend.
pub mod memory;
/// MongoDB backend.
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use futures::future::BoxFuture;
use uuid::Uuid;

use crate::dao::{
    models::{
        ConnectionRequestEntity, GameJamEntity, SessionEntity, TagEntity, TeamEntity, UserEntity,
    },
    query::{GameJamFilter, Page, PageRequest, UserFilter},
    storage::StorageResult,
};

/// Abstraction over the persistence layer for members, teams and game jams.
///
/// Lookups by a list of ids return the records that exist, in no particular order.
pub trait JamStore: Send + Sync {
    /// List users with a profile matching `filter`, ordered by id ascending.
    fn find_users(
        &self,
        filter: UserFilter,
        page: PageRequest,
    ) -> BoxFuture<'static, StorageResult<Page<UserEntity>>>;
    /// Fetch a user by id.
    fn find_user(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<UserEntity>>>;
    /// Fetch the user owning the profile with the given username.
    fn find_user_by_username(
        &self,
        username: String,
    ) -> BoxFuture<'static, StorageResult<Option<UserEntity>>>;
    /// Fetch every user whose id is listed.
    fn find_users_by_ids(&self, ids: Vec<Uuid>)
    -> BoxFuture<'static, StorageResult<Vec<UserEntity>>>;
    /// Insert or replace a user.
    fn save_user(&self, user: UserEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// List every tag.
    fn list_tags(&self) -> BoxFuture<'static, StorageResult<Vec<TagEntity>>>;
    /// Fetch every tag whose id is listed.
    fn find_tags(&self, ids: Vec<Uuid>) -> BoxFuture<'static, StorageResult<Vec<TagEntity>>>;
    /// Accepted connection requests sent or received by the user.
    fn find_accepted_connections(
        &self,
        user_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<ConnectionRequestEntity>>>;
    /// Teams the user is a member of.
    fn find_teams_by_member(
        &self,
        user_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<TeamEntity>>>;
    /// Teams registered for any of the listed game jams.
    fn find_teams_by_game_jams(
        &self,
        game_jam_ids: Vec<Uuid>,
    ) -> BoxFuture<'static, StorageResult<Vec<TeamEntity>>>;
    /// List game jams matching `filter` at the store's current time, ordered by
    /// start date descending then id ascending.
    fn find_game_jams(
        &self,
        filter: GameJamFilter,
        page: PageRequest,
    ) -> BoxFuture<'static, StorageResult<Page<GameJamEntity>>>;
    /// Fetch a game jam by id.
    fn find_game_jam(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameJamEntity>>>;
    /// Fetch every game jam whose id is listed.
    fn find_game_jams_by_ids(
        &self,
        ids: Vec<Uuid>,
    ) -> BoxFuture<'static, StorageResult<Vec<GameJamEntity>>>;
    /// Insert or replace a game jam.
    fn save_game_jam(&self, jam: GameJamEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Fetch the session issued with the given bearer token.
    fn find_session(&self, token: String)
    -> BoxFuture<'static, StorageResult<Option<SessionEntity>>>;
    /// Check that the backend answers.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Re-establish the backend connection after a failed health check.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
