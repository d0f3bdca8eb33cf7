use axum::{Json, Router, extract::State, routing::get};

use crate::{
    dto::tag::TagsResponse, error::AppError, services::tag_service, state::SharedState,
};

/// Tag catalogue used by the profile editor.
pub fn router() -> Router<SharedState> {
    Router::new().route("/tags", get(list_tags))
}

/// Every tag with its category.
#[utoipa::path(
    get,
    path = "/tags",
    tag = "tags",
    responses((status = 200, description = "All tags", body = TagsResponse))
)]
pub async fn list_tags(State(state): State<SharedState>) -> Result<Json<TagsResponse>, AppError> {
    Ok(Json(tag_service::list_tags(&state).await?))
}
