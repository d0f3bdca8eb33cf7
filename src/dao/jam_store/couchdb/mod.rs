mod config;
mod error;
mod models;
mod store;

pub use config::CouchConfig;
pub use error::CouchDaoError;
pub use store::CouchJamStore;

use reqwest::StatusCode;

use crate::dao::storage::StorageError;

impl From<CouchDaoError> for StorageError {
    fn from(err: CouchDaoError) -> Self {
        match err {
            // CouchDB answers 409 when the revision we carried over went stale.
            CouchDaoError::RequestStatus {
                status: StatusCode::CONFLICT,
                ..
            }
            | CouchDaoError::UsernameTaken { .. } => StorageError::conflict(err.to_string()),
            other => StorageError::unavailable(other.to_string(), other),
        }
    }
}
