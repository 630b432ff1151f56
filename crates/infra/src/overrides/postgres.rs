//! Postgres-backed override store.
//!
//! Maps to the `access_overrides` table (see `migrations/`). Upserts are a
//! single `INSERT … ON CONFLICT` statement, so concurrent writers to the same
//! identity serialise on the row lock and the last commit wins.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Row};
use tracing::{instrument, Span};

use muster_auth::Role;
use muster_core::Identity;

use super::store::{AccessEntry, OverrideStore, OverrideUpsert};
use crate::error::{map_sqlx_error, StoreError};

#[derive(Debug, Clone)]
pub struct PostgresOverrideStore {
    pool: Arc<PgPool>,
}

impl PostgresOverrideStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

#[async_trait]
impl OverrideStore for PostgresOverrideStore {
    #[instrument(skip(self), fields(identity = %identity), err)]
    async fn get(&self, identity: &Identity) -> Result<Option<AccessEntry>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT
                identity,
                display_name,
                role,
                added_by,
                updated_by,
                created_at,
                updated_at
            FROM access_overrides
            WHERE identity = $1
            "#,
        )
        .bind(identity.as_str())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_override", e))?;

        match row {
            Some(row) => {
                let entry = AccessEntryRow::from_row(&row)
                    .map_err(|e| map_sqlx_error("get_override", e))?;
                Ok(Some(entry.try_into()?))
            }
            None => Ok(None),
        }
    }

    #[instrument(
        skip(self, request),
        fields(identity = %request.identity, role = %request.role, actor = %request.actor),
        err
    )]
    async fn upsert(&self, request: OverrideUpsert) -> Result<AccessEntry, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO access_overrides (
                identity,
                display_name,
                role,
                added_by,
                updated_by
            )
            VALUES ($1, $2, $3, $4, $4)
            ON CONFLICT (identity)
            DO UPDATE SET
                role = EXCLUDED.role,
                display_name = EXCLUDED.display_name,
                updated_by = EXCLUDED.updated_by,
                updated_at = clock_timestamp()
            RETURNING
                identity,
                display_name,
                role,
                added_by,
                updated_by,
                created_at,
                updated_at
            "#,
        )
        .bind(request.identity.as_str())
        .bind(request.display_name.as_deref())
        .bind(request.role.as_str())
        .bind(request.actor.as_str())
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("upsert_override", e))?;

        let entry = AccessEntryRow::from_row(&row)
            .map_err(|e| map_sqlx_error("upsert_override", e))?;
        entry.try_into()
    }

    #[instrument(skip(self), fields(identity = %identity), err)]
    async fn remove(&self, identity: &Identity) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM access_overrides WHERE identity = $1")
            .bind(identity.as_str())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("remove_override", e))?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), fields(row_count = tracing::field::Empty), err)]
    async fn list(&self) -> Result<Vec<AccessEntry>, StoreError> {
        let span = Span::current();

        let rows = sqlx::query(
            r#"
            SELECT
                identity,
                display_name,
                role,
                added_by,
                updated_by,
                created_at,
                updated_at
            FROM access_overrides
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_overrides", e))?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let entry = AccessEntryRow::from_row(&row)
                .map_err(|e| map_sqlx_error("list_overrides", e))?;
            entries.push(entry.try_into()?);
        }

        span.record("row_count", entries.len());
        Ok(entries)
    }
}

// SQLx row types

#[derive(Debug)]
struct AccessEntryRow {
    identity: String,
    display_name: Option<String>,
    role: String,
    added_by: Option<String>,
    updated_by: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for AccessEntryRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(AccessEntryRow {
            identity: row.try_get("identity")?,
            display_name: row.try_get("display_name")?,
            role: row.try_get("role")?,
            added_by: row.try_get("added_by")?,
            updated_by: row.try_get("updated_by")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl TryFrom<AccessEntryRow> for AccessEntry {
    type Error = StoreError;

    fn try_from(row: AccessEntryRow) -> Result<Self, Self::Error> {
        let identity = Identity::parse(&row.identity)
            .map_err(|e| StoreError::Decode(format!("access_overrides.identity: {e}")))?;
        let role: Role = row
            .role
            .parse()
            .map_err(|e| StoreError::Decode(format!("access_overrides.role: {e}")))?;

        Ok(AccessEntry {
            identity,
            display_name: row.display_name,
            role,
            added_by: row.added_by,
            updated_by: row.updated_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
