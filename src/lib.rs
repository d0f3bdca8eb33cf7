//! Library crate for jam-hub-back, exposing modules for binaries and integration tests.

/// Injectable source of the current time.
pub mod clock;
/// Runtime configuration loaded from JSON.
pub mod config;
/// Entities, queries and storage backends.
pub mod dao;
/// Request and response payloads.
pub mod dto;
/// Service and HTTP error types.
pub mod error;
/// HTTP routers.
pub mod routes;
/// Business logic behind the routes.
pub mod services;
/// Shared application state.
pub mod state;
