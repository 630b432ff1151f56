//! Postgres pool wiring and schema migration.

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use crate::config::AccessConfig;
use crate::error::{map_sqlx_error, StoreError};

/// Schema for the two tables this engine owns.
pub const SCHEMA: &str = include_str!("../migrations/0001_access_control.sql");

/// Open a connection pool using the configured size and timeout.
///
/// Acquiring a connection is bounded by the store timeout so a saturated pool
/// surfaces as `StoreUnavailable` instead of hanging a request.
pub async fn connect(config: &AccessConfig, database_url: &str) -> Result<PgPool, StoreError> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.store_timeout)
        .connect(database_url)
        .await
        .map_err(|e| map_sqlx_error("connect", e))?;
    info!(max_connections = config.max_connections, "connected to postgres");
    Ok(pool)
}

/// Apply the schema (idempotent).
pub async fn migrate(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::raw_sql(SCHEMA)
        .execute(pool)
        .await
        .map_err(|e| map_sqlx_error("migrate", e))?;
    info!("access-control schema applied");
    Ok(())
}
