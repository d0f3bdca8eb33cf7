use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Jam Hub Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::users::list_users,
        crate::routes::users::get_user,
        crate::routes::users::get_user_by_username,
        crate::routes::users::get_me,
        crate::routes::users::update_user,
        crate::routes::gamejams::list_game_jams,
        crate::routes::gamejams::get_game_jam,
        crate::routes::gamejams::save_game_jam,
        crate::routes::tags::list_tags,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::health::HealthStatus,
            crate::error::ErrorBody,
            crate::dao::models::SkillLevel,
            crate::dao::query::TimeFrame,
            crate::dto::user::UserRef,
            crate::dto::user::UserListItem,
            crate::dto::user::UsersPage,
            crate::dto::user::UserDetail,
            crate::dto::user::UpdateUserRequest,
            crate::dto::gamejam::TeamView,
            crate::dto::gamejam::GameJamListItem,
            crate::dto::gamejam::GameJamsPage,
            crate::dto::gamejam::GameJamDetail,
            crate::dto::gamejam::SaveGameJamRequest,
            crate::dto::gamejam::SavedGameJam,
            crate::dto::tag::TagView,
            crate::dto::tag::TagCategoryView,
            crate::dto::tag::TagsResponse,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "users", description = "Member listings and profiles"),
        (name = "gamejams", description = "Game jam listings and hosting"),
        (name = "tags", description = "Profile tags"),
    )
)]
pub struct ApiDoc;

/// Registers the `bearer` scheme referenced by protected routes.
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/healthcheck",
            "/users",
            "/users/{id}",
            "/users/by-username/{username}",
            "/users/me",
            "/gamejams",
            "/gamejams/{id}",
            "/tags",
        ] {
            assert!(doc.paths.paths.contains_key(path), "{path} missing");
        }
        assert!(
            doc.components
                .as_ref()
                .is_some_and(|components| components.security_schemes.contains_key("bearer"))
        );
    }
}
