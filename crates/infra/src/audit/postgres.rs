//! Postgres-backed audit log (`audit_log` table).

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Row};
use tracing::{instrument, Span};

use super::store::AuditLog;
use super::types::{AuditEntry, AuditQuery, NewAuditEntry};
use crate::error::{map_sqlx_error, StoreError};

#[derive(Debug, Clone)]
pub struct PostgresAuditLog {
    pool: Arc<PgPool>,
}

impl PostgresAuditLog {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

#[async_trait]
impl AuditLog for PostgresAuditLog {
    #[instrument(
        skip(self, entry),
        fields(area = %entry.area, action = %entry.action, audit_id = tracing::field::Empty),
        err
    )]
    async fn append(&self, entry: NewAuditEntry) -> Result<AuditEntry, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO audit_log (
                actor_identity,
                actor_display_name,
                actor_role,
                area,
                action,
                target,
                metadata
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING
                id,
                actor_identity,
                actor_display_name,
                actor_role,
                area,
                action,
                target,
                metadata,
                created_at
            "#,
        )
        .bind(&entry.actor_identity)
        .bind(entry.actor_display_name.as_deref())
        .bind(entry.actor_role.as_deref())
        .bind(&entry.area)
        .bind(&entry.action)
        .bind(entry.target.as_deref())
        .bind(entry.metadata.as_ref())
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("append_audit", e))?;

        let stored: AuditEntry = AuditEntryRow::from_row(&row)
            .map_err(|e| map_sqlx_error("append_audit", e))?
            .into();
        Span::current().record("audit_id", stored.id);
        Ok(stored)
    }

    #[instrument(skip(self), fields(row_count = tracing::field::Empty), err)]
    async fn query(&self, query: &AuditQuery) -> Result<Vec<AuditEntry>, StoreError> {
        let query = query.normalized();
        let free_text = query
            .free_text
            .as_deref()
            .map(|text| format!("%{}%", escape_like(text)));

        let rows = sqlx::query(
            r#"
            SELECT
                id,
                actor_identity,
                actor_display_name,
                actor_role,
                area,
                action,
                target,
                metadata,
                created_at
            FROM audit_log
            WHERE ($1::text IS NULL OR area = $1)
              AND ($2::text IS NULL OR actor_identity = $2)
              AND ($3::text IS NULL OR action = $3)
              AND ($4::text IS NULL OR target = $4)
              AND (
                    $5::text IS NULL
                    OR actor_identity ILIKE $5
                    OR actor_display_name ILIKE $5
                    OR area ILIKE $5
                    OR action ILIKE $5
                    OR target ILIKE $5
              )
            ORDER BY created_at DESC, id DESC
            LIMIT $6
            "#,
        )
        .bind(query.area.as_deref())
        .bind(query.actor_identity.as_deref())
        .bind(query.action.as_deref())
        .bind(query.target.as_deref())
        .bind(free_text.as_deref())
        .bind(query.clamped_limit())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("query_audit", e))?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let entry = AuditEntryRow::from_row(&row)
                .map_err(|e| map_sqlx_error("query_audit", e))?;
            entries.push(entry.into());
        }

        Span::current().record("row_count", entries.len());
        Ok(entries)
    }

    #[instrument(skip(self), err)]
    async fn latest_display_name(&self, actor_identity: &str) -> Result<Option<String>, StoreError> {
        let name = sqlx::query_scalar::<_, String>(
            r#"
            SELECT actor_display_name
            FROM audit_log
            WHERE actor_identity = $1
              AND actor_display_name IS NOT NULL
              AND btrim(actor_display_name) <> ''
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(actor_identity)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("latest_audit_display_name", e))?;

        Ok(name)
    }
}

/// Escape `LIKE` wildcards so user text matches literally.
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

// SQLx row types

#[derive(Debug)]
struct AuditEntryRow {
    id: i64,
    actor_identity: String,
    actor_display_name: Option<String>,
    actor_role: Option<String>,
    area: String,
    action: String,
    target: Option<String>,
    metadata: Option<serde_json::Value>,
    created_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for AuditEntryRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(AuditEntryRow {
            id: row.try_get("id")?,
            actor_identity: row.try_get("actor_identity")?,
            actor_display_name: row.try_get("actor_display_name")?,
            actor_role: row.try_get("actor_role")?,
            area: row.try_get("area")?,
            action: row.try_get("action")?,
            target: row.try_get("target")?,
            metadata: row.try_get("metadata")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl From<AuditEntryRow> for AuditEntry {
    fn from(row: AuditEntryRow) -> Self {
        AuditEntry {
            id: row.id,
            actor_identity: row.actor_identity,
            actor_display_name: row.actor_display_name,
            actor_role: row.actor_role,
            area: row.area,
            action: row.action,
            target: row.target,
            metadata: row.metadata,
            created_at: row.created_at,
        }
    }
}
