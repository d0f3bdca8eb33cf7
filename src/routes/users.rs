use axum::{Json, Router, extract::State, routing::get};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::user::{ListUsersQuery, UpdateUserRequest, UserDetail, UsersPage},
    error::{AppError, ErrorBody},
    routes::{
        auth::AuthenticatedUser,
        extract::{ApiJson, ApiPath, ApiQuery},
    },
    services::user_service,
    state::SharedState,
};

/// Member listing, profile pages and profile edits.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/me", get(get_me))
        .route("/users/by-username/{username}", get(get_user_by_username))
        .route("/users/{id}", get(get_user).put(update_user))
}

/// List onboarded users ordered by id, one cursor page at a time.
#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    params(ListUsersQuery),
    responses(
        (status = 200, description = "One page of users", body = UsersPage),
        (status = 400, description = "Invalid limit or cursor", body = ErrorBody)
    )
)]
pub async fn list_users(
    State(state): State<SharedState>,
    ApiQuery(query): ApiQuery<ListUsersQuery>,
) -> Result<Json<UsersPage>, AppError> {
    query.validate()?;
    Ok(Json(user_service::list_users(&state, query).await?))
}

/// Profile page of a user.
#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "users",
    params(("id" = String, Path, description = "Identifier of the user")),
    responses(
        (status = 200, description = "User profile", body = UserDetail),
        (status = 404, description = "No such user", body = ErrorBody),
        (status = 409, description = "User has not completed onboarding", body = ErrorBody)
    )
)]
pub async fn get_user(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<UserDetail>, AppError> {
    Ok(Json(user_service::get_user(&state, id).await?))
}

/// Profile page of the user owning a username.
#[utoipa::path(
    get,
    path = "/users/by-username/{username}",
    tag = "users",
    params(("username" = String, Path, description = "Username without the leading `@`")),
    responses(
        (status = 200, description = "User profile", body = UserDetail),
        (status = 404, description = "No such user", body = ErrorBody)
    )
)]
pub async fn get_user_by_username(
    State(state): State<SharedState>,
    ApiPath(username): ApiPath<String>,
) -> Result<Json<UserDetail>, AppError> {
    Ok(Json(
        user_service::get_user_by_username(&state, username).await?,
    ))
}

/// Profile page of the authenticated caller.
#[utoipa::path(
    get,
    path = "/users/me",
    tag = "users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Caller profile", body = UserDetail),
        (status = 401, description = "Missing or invalid session", body = ErrorBody),
        (status = 409, description = "Caller has not completed onboarding", body = ErrorBody)
    )
)]
pub async fn get_me(
    State(state): State<SharedState>,
    AuthenticatedUser(caller): AuthenticatedUser,
) -> Result<Json<UserDetail>, AppError> {
    Ok(Json(user_service::get_me(&state, caller).await?))
}

/// Edit the caller's own profile.
#[utoipa::path(
    put,
    path = "/users/{id}",
    tag = "users",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Identifier of the user, must be the caller")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated profile", body = UserDetail),
        (status = 400, description = "Invalid patch or unknown tags", body = ErrorBody),
        (status = 401, description = "Missing or invalid session", body = ErrorBody),
        (status = 403, description = "Caller is not this user", body = ErrorBody),
        (status = 409, description = "Username already taken", body = ErrorBody)
    )
)]
pub async fn update_user(
    State(state): State<SharedState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<UpdateUserRequest>,
) -> Result<Json<UserDetail>, AppError> {
    payload.validate()?;
    Ok(Json(
        user_service::update_user(&state, caller, id, payload).await?,
    ))
}
