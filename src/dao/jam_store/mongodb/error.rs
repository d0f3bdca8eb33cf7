use mongodb::error::Error as MongoError;
use thiserror::Error;

/// Result alias returning [`MongoDaoError`] failures.
pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

/// Failures that can occur while interacting with MongoDB.
#[derive(Debug, Error)]
pub enum MongoDaoError {
    /// The connection string could not be parsed.
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        /// Offending URI.
        uri: String,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// The driver refused the client options.
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// The server never answered the initial ping.
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        /// Number of pings sent.
        attempts: u32,
        /// Last driver error.
        #[source]
        source: MongoError,
    },
    /// Periodic ping failed.
    #[error("MongoDB ping health check failed")]
    HealthPing {
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// An index could not be created.
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        /// Collection name.
        collection: &'static str,
        /// Index name.
        index: &'static str,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// A lookup or listing failed.
    #[error("failed to query collection `{collection}`")]
    Query {
        /// Collection name.
        collection: &'static str,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// An upsert failed.
    #[error("failed to save `{id}` into collection `{collection}`")]
    Save {
        /// Collection name.
        collection: &'static str,
        /// Identifier of the record being saved.
        id: String,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// An upsert hit a unique index, e.g. a username taken concurrently.
    #[error("duplicate key while saving `{id}` into collection `{collection}`")]
    DuplicateKey {
        /// Collection name.
        collection: &'static str,
        /// Identifier of the record being saved.
        id: String,
    },
}
