//! Override store: persisted identity → role assignments.

pub mod postgres;
pub mod store;

pub use postgres::PostgresOverrideStore;
pub use store::{AccessEntry, InMemoryOverrideStore, OverrideStore, OverrideUpsert};
