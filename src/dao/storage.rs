use std::error::Error;
use thiserror::Error;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Backend-agnostic failure of a [`JamStore`](crate::dao::jam_store::JamStore) call.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend could not be reached or rejected the operation.
    #[error("storage unavailable: {message}")]
    Unavailable {
        /// What the store was doing.
        message: String,
        /// Driver or HTTP failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// A write lost a race against a concurrent write (unique key or revision clash).
    #[error("storage write conflict: {message}")]
    Conflict {
        /// What the store was saving.
        message: String,
    },
}

impl StorageError {
    /// Wrap any backend failure as [`StorageError::Unavailable`].
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }

    /// Report a lost write race.
    pub fn conflict(message: impl Into<String>) -> Self {
        StorageError::Conflict {
            message: message.into(),
        }
    }
}
