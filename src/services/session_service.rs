//! Bearer token resolution against the stored sessions.

use tracing::debug;
use uuid::Uuid;

use crate::{error::ServiceError, state::SharedState};

/// Resolve a bearer token to the id of the user it was issued to.
pub async fn authenticate(state: &SharedState, token: &str) -> Result<Uuid, ServiceError> {
    let store = state.require_jam_store().await?;
    let session = store
        .find_session(token.to_owned())
        .await?
        .ok_or_else(|| ServiceError::Unauthorized("unknown session".into()))?;

    if session.expires_at <= state.now() {
        debug!(user_id = %session.user_id, "rejected expired session");
        return Err(ServiceError::Unauthorized("session expired".into()));
    }

    Ok(session.user_id)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use time::macros::datetime;

    use super::*;
    use crate::{
        clock::Clock,
        config::AppConfig,
        dao::{
            jam_store::memory::{MemoryJamStore, MemorySeed},
            models::SessionEntity,
        },
        state::AppState,
    };

    fn state() -> SharedState {
        let seed = MemorySeed {
            sessions: vec![
                SessionEntity {
                    token: "live".into(),
                    user_id: Uuid::from_u128(1),
                    expires_at: datetime!(2024-02-01 00:00 UTC),
                },
                SessionEntity {
                    token: "stale".into(),
                    user_id: Uuid::from_u128(1),
                    expires_at: datetime!(2023-12-31 00:00 UTC),
                },
            ],
            ..Default::default()
        };
        let clock = Clock::Fixed(datetime!(2024-01-02 00:00 UTC));
        AppState::with_store(
            AppConfig::default(),
            clock,
            Arc::new(MemoryJamStore::from_seed(seed, clock)),
        )
    }

    #[tokio::test]
    async fn live_session_resolves_to_user() {
        assert_eq!(authenticate(&state(), "live").await.unwrap(), Uuid::from_u128(1));
    }

    #[tokio::test]
    async fn unknown_and_expired_sessions_are_unauthorized() {
        let state = state();
        for token in ["stale", "missing"] {
            let err = authenticate(&state, token).await.unwrap_err();
            assert!(matches!(err, ServiceError::Unauthorized(_)), "{token}");
        }
    }
}
