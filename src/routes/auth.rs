use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use uuid::Uuid;

use crate::{error::AppError, services::session_service, state::SharedState};

const BEARER_PREFIX: &str = "Bearer ";

/// Caller resolved from the `Authorization: Bearer <token>` header.
///
/// Rejects the request with 401 before the handler runs when the header is
/// missing or the session is unknown or expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser(pub Uuid);

impl FromRequestParts<SharedState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix(BEARER_PREFIX))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                AppError::Unauthorized("missing bearer token in `Authorization` header".into())
            })?;

        let user_id = session_service::authenticate(state, token).await?;
        Ok(Self(user_id))
    }
}
