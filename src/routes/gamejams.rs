use axum::{Json, Router, extract::State, routing::get};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::gamejam::{GameJamDetail, GameJamsPage, ListGameJamsQuery, SaveGameJamRequest, SavedGameJam},
    error::{AppError, ErrorBody},
    routes::{
        auth::AuthenticatedUser,
        extract::{ApiJson, ApiPath, ApiQuery},
    },
    services::gamejam_service,
    state::SharedState,
};

/// Game jam listing, details and upsert.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/gamejams", get(list_game_jams).post(save_game_jam))
        .route("/gamejams/{id}", get(get_game_jam))
}

/// List game jams by start date descending, one cursor page at a time.
#[utoipa::path(
    get,
    path = "/gamejams",
    tag = "gamejams",
    params(ListGameJamsQuery),
    responses(
        (status = 200, description = "One page of game jams", body = GameJamsPage),
        (status = 400, description = "Invalid limit, cursor or time frame", body = ErrorBody)
    )
)]
pub async fn list_game_jams(
    State(state): State<SharedState>,
    ApiQuery(query): ApiQuery<ListGameJamsQuery>,
) -> Result<Json<GameJamsPage>, AppError> {
    query.validate()?;
    Ok(Json(gamejam_service::list_game_jams(&state, query).await?))
}

/// Game jam with hosts and teams.
#[utoipa::path(
    get,
    path = "/gamejams/{id}",
    tag = "gamejams",
    params(("id" = String, Path, description = "Identifier of the game jam")),
    responses(
        (status = 200, description = "Game jam", body = GameJamDetail),
        (status = 404, description = "No such game jam", body = ErrorBody)
    )
)]
pub async fn get_game_jam(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<GameJamDetail>, AppError> {
    Ok(Json(gamejam_service::get_game_jam(&state, id).await?))
}

/// Create a game jam hosted by the caller, or update one the caller hosts.
#[utoipa::path(
    post,
    path = "/gamejams",
    tag = "gamejams",
    security(("bearer" = [])),
    request_body = SaveGameJamRequest,
    responses(
        (status = 200, description = "Saved game jam", body = SavedGameJam),
        (status = 400, description = "Invalid name or date range", body = ErrorBody),
        (status = 401, description = "Missing or invalid session", body = ErrorBody),
        (status = 403, description = "Caller does not host this game jam", body = ErrorBody),
        (status = 404, description = "No game jam with this id", body = ErrorBody)
    )
)]
pub async fn save_game_jam(
    State(state): State<SharedState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    ApiJson(payload): ApiJson<SaveGameJamRequest>,
) -> Result<Json<SavedGameJam>, AppError> {
    payload.validate()?;
    Ok(Json(
        gamejam_service::save_game_jam(&state, caller, payload).await?,
    ))
}
