/// Persistence backends and the store abstraction.
pub mod jam_store;
/// Database model definitions.
pub mod models;
/// Filters, time buckets and cursor pagination shared by the backends.
pub mod query;
/// Storage abstraction layer for database operations.
pub mod storage;
