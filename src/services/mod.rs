/// OpenAPI documentation generation.
pub mod documentation;
/// Game jam listings, details and upserts.
pub mod gamejam_service;
/// Health check service.
pub mod health_service;
/// Bearer token resolution.
pub mod session_service;
/// Background connection and health supervision of the store.
pub mod storage_supervisor;
/// Tag catalogue.
pub mod tag_service;
/// Member listings, profile pages and profile edits.
pub mod user_service;
