//! Best-effort display-name enrichment from side histories.
//!
//! Names are cosmetic: a failing or slow source is a miss, never an error.
//! Sources are consulted in priority order and the first hit wins.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, instrument};

use muster_core::Identity;

use crate::audit::AuditLog;
use crate::config::{is_sql_identifier, ConfigError, SubmissionNamesConfig};
use crate::error::{bounded, map_sqlx_error, StoreError};

#[async_trait]
pub trait NameSource: Send + Sync {
    /// Short label used in logs.
    fn name(&self) -> &'static str;

    /// Most recent non-empty display name seen for `identity`.
    async fn recent_display_name(&self, identity: &Identity) -> Result<Option<String>, StoreError>;
}

#[async_trait]
impl<N> NameSource for Arc<N>
where
    N: NameSource + ?Sized,
{
    fn name(&self) -> &'static str {
        (**self).name()
    }

    async fn recent_display_name(&self, identity: &Identity) -> Result<Option<String>, StoreError> {
        (**self).recent_display_name(identity).await
    }
}

/// First hit across `sources`, each call bounded by `timeout`.
pub async fn first_display_name(
    sources: &[Arc<dyn NameSource>],
    identity: &Identity,
    timeout: Duration,
) -> Option<String> {
    for source in sources {
        match bounded(timeout, source.name(), source.recent_display_name(identity)).await {
            Ok(Some(name)) => return Some(name),
            Ok(None) => {}
            Err(err) => {
                debug!(source = source.name(), %identity, error = %err, "name lookup failed; skipping");
            }
        }
    }
    None
}

/// Name source backed by a map (tests/dev).
#[derive(Debug, Default)]
pub struct InMemoryNameSource {
    names: RwLock<HashMap<Identity, String>>,
}

impl InMemoryNameSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember `name` as the most recent for `identity`. Blank names are ignored.
    pub fn remember(&self, identity: Identity, name: &str) {
        let name = name.trim();
        if name.is_empty() {
            return;
        }
        if let Ok(mut names) = self.names.write() {
            names.insert(identity, name.to_string());
        }
    }
}

#[async_trait]
impl NameSource for InMemoryNameSource {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn recent_display_name(&self, identity: &Identity) -> Result<Option<String>, StoreError> {
        let names = self
            .names
            .read()
            .map_err(|_| StoreError::Unavailable("name source lock poisoned".to_string()))?;
        Ok(names.get(identity).cloned())
    }
}

/// Names the identity last used when performing an audited action.
#[derive(Debug, Clone)]
pub struct AuditActivityNames<L> {
    log: L,
}

impl<L: AuditLog> AuditActivityNames<L> {
    pub fn new(log: L) -> Self {
        Self { log }
    }
}

#[async_trait]
impl<L: AuditLog> NameSource for AuditActivityNames<L> {
    fn name(&self) -> &'static str {
        "audit_activity"
    }

    async fn recent_display_name(&self, identity: &Identity) -> Result<Option<String>, StoreError> {
        self.log.latest_display_name(identity.as_str()).await
    }
}

/// Names from the application-submission history.
///
/// Table and column names come from configuration and are interpolated into
/// the statement, so they are re-checked here.
#[derive(Debug, Clone)]
pub struct PostgresSubmissionNames {
    pool: Arc<PgPool>,
    sql: String,
}

impl PostgresSubmissionNames {
    pub fn new(pool: PgPool, config: &SubmissionNamesConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            pool: Arc::new(pool),
            sql: submission_name_sql(config)?,
        })
    }
}

fn submission_name_sql(config: &SubmissionNamesConfig) -> Result<String, ConfigError> {
    for (key, value) in [
        ("MUSTER_SUBMISSIONS_TABLE", &config.table),
        ("MUSTER_SUBMISSIONS_IDENTITY_COLUMN", &config.identity_column),
        ("MUSTER_SUBMISSIONS_NAME_COLUMN", &config.name_column),
        ("MUSTER_SUBMISSIONS_ORDER_COLUMN", &config.order_column),
    ] {
        if !is_sql_identifier(value) {
            return Err(ConfigError::InvalidValue {
                key,
                reason: format!("not a plain SQL identifier: {value:?}"),
            });
        }
    }

    let SubmissionNamesConfig {
        table,
        identity_column,
        name_column,
        order_column,
    } = config;

    Ok(format!(
        "SELECT {name_column} FROM {table} \
         WHERE {identity_column} = $1 \
           AND {name_column} IS NOT NULL \
           AND btrim({name_column}) <> '' \
         ORDER BY {order_column} DESC \
         LIMIT 1"
    ))
}

#[async_trait]
impl NameSource for PostgresSubmissionNames {
    fn name(&self) -> &'static str {
        "submissions"
    }

    #[instrument(skip(self), fields(identity = %identity), err)]
    async fn recent_display_name(&self, identity: &Identity) -> Result<Option<String>, StoreError> {
        sqlx::query_scalar::<_, String>(&self.sql)
            .bind(identity.as_str())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("submission_display_name", e))
    }
}
