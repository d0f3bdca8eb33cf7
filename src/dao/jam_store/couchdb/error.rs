//! Error types shared by the CouchDB storage implementation.

use reqwest::StatusCode;
use thiserror::Error;

/// Result alias returning [`CouchDaoError`] failures.
pub type CouchResult<T> = Result<T, CouchDaoError>;

/// Failures that can occur while interacting with CouchDB.
#[derive(Debug, Error)]
pub enum CouchDaoError {
    /// Required environment variable is missing.
    #[error("missing CouchDB environment variable `{var}`")]
    MissingEnvVar {
        /// Variable name.
        var: &'static str,
    },
    /// Building the HTTP client failed.
    #[error("failed to build CouchDB client")]
    ClientBuilder {
        /// HTTP client error.
        #[source]
        source: reqwest::Error,
    },
    /// The database existence check could not be sent.
    #[error("failed to query CouchDB database `{database}`")]
    DatabaseQuery {
        /// Database name.
        database: String,
        /// HTTP client error.
        #[source]
        source: reqwest::Error,
    },
    /// The database creation request could not be sent.
    #[error("failed to create CouchDB database `{database}`")]
    DatabaseCreate {
        /// Database name.
        database: String,
        /// HTTP client error.
        #[source]
        source: reqwest::Error,
    },
    /// CouchDB answered a database operation with an unexpected status.
    #[error("unexpected CouchDB database response status {status} for `{database}`")]
    DatabaseStatus {
        /// Database name.
        database: String,
        /// Status received.
        status: StatusCode,
    },
    /// A document request could not be sent.
    #[error("failed to send CouchDB request to `{path}`")]
    RequestSend {
        /// Request path relative to the database.
        path: String,
        /// HTTP client error.
        #[source]
        source: reqwest::Error,
    },
    /// CouchDB answered a document request with an unexpected status.
    #[error("unexpected CouchDB response status {status} for `{path}`")]
    RequestStatus {
        /// Request path relative to the database.
        path: String,
        /// Status received.
        status: StatusCode,
    },
    /// Response body was not valid JSON.
    #[error("failed to decode CouchDB response for `{path}`")]
    DecodeResponse {
        /// Request path relative to the database.
        path: String,
        /// HTTP client error.
        #[source]
        source: reqwest::Error,
    },
    /// A document did not match the expected model.
    #[error("failed to deserialize CouchDB document from `{path}`")]
    DeserializeValue {
        /// Request path relative to the database.
        path: String,
        /// Decoding error.
        #[source]
        source: serde_json::Error,
    },
    /// Another user already holds the username claim.
    #[error("username `{username}` is already claimed")]
    UsernameTaken {
        /// Contested username.
        username: String,
    },
}
