use axum::Router;

use crate::state::SharedState;

/// Bearer session extractor.
pub mod auth;
/// Swagger UI and OpenAPI document.
pub mod docs;
/// Extractors answering malformed input with JSON errors.
pub mod extract;
/// Game jam endpoints.
pub mod gamejams;
/// Health check endpoint.
pub mod health;
/// Tag catalogue endpoint.
pub mod tags;
/// User endpoints.
pub mod users;

/// Compose the API and documentation routes over the shared state.
pub fn router(state: SharedState) -> Router<()> {
    health::router()
        .merge(users::router())
        .merge(gamejams::router())
        .merge(tags::router())
        .merge(docs::router())
        .with_state(state)
}
