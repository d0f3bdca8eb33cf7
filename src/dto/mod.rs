/// Game jam listings, details and the upsert payload.
pub mod gamejam;
/// Health check payload.
pub mod health;
/// Tag views.
pub mod tag;
/// User listings, profile views and the profile patch.
pub mod user;
/// Custom validators shared by request payloads.
pub mod validation;
