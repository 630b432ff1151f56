//! Audit log abstraction and in-memory implementation.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::Utc;

use super::types::{AuditEntry, AuditQuery, NewAuditEntry};
use crate::error::StoreError;

/// Append-only audit storage.
///
/// Entries are never updated or deleted. `query` returns newest first
/// (`created_at DESC, id DESC`) and applies `AuditQuery::normalized`
/// semantics (clamped limit, blank filters ignored).
#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn append(&self, entry: NewAuditEntry) -> Result<AuditEntry, StoreError>;

    async fn query(&self, query: &AuditQuery) -> Result<Vec<AuditEntry>, StoreError>;

    /// Most recent non-empty `actor_display_name` recorded for `actor_identity`.
    async fn latest_display_name(&self, actor_identity: &str) -> Result<Option<String>, StoreError>;
}

#[async_trait]
impl<L> AuditLog for Arc<L>
where
    L: AuditLog + ?Sized,
{
    async fn append(&self, entry: NewAuditEntry) -> Result<AuditEntry, StoreError> {
        (**self).append(entry).await
    }

    async fn query(&self, query: &AuditQuery) -> Result<Vec<AuditEntry>, StoreError> {
        (**self).query(query).await
    }

    async fn latest_display_name(&self, actor_identity: &str) -> Result<Option<String>, StoreError> {
        (**self).latest_display_name(actor_identity).await
    }
}

/// In-memory audit log for tests/dev.
///
/// Ids start at 1 and `created_at` never goes backwards, so insertion order
/// is the same as `(created_at, id)` order.
#[derive(Debug, Default)]
pub struct InMemoryAuditLog {
    entries: RwLock<Vec<AuditEntry>>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn poisoned() -> StoreError {
        StoreError::Unavailable("audit log lock poisoned".to_string())
    }
}

#[async_trait]
impl AuditLog for InMemoryAuditLog {
    async fn append(&self, entry: NewAuditEntry) -> Result<AuditEntry, StoreError> {
        let mut entries = self.entries.write().map_err(|_| Self::poisoned())?;

        let now = Utc::now();
        let created_at = entries
            .last()
            .map(|last| last.created_at.max(now))
            .unwrap_or(now);

        let stored = AuditEntry {
            id: entries.len() as i64 + 1,
            actor_identity: entry.actor_identity,
            actor_display_name: entry.actor_display_name,
            actor_role: entry.actor_role,
            area: entry.area,
            action: entry.action,
            target: entry.target,
            metadata: entry.metadata,
            created_at,
        };
        entries.push(stored.clone());
        Ok(stored)
    }

    async fn query(&self, query: &AuditQuery) -> Result<Vec<AuditEntry>, StoreError> {
        let query = query.normalized();
        let limit = query.clamped_limit() as usize;
        let entries = self.entries.read().map_err(|_| Self::poisoned())?;

        Ok(entries
            .iter()
            .rev()
            .filter(|entry| query.matches(entry))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn latest_display_name(&self, actor_identity: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.read().map_err(|_| Self::poisoned())?;
        Ok(entries
            .iter()
            .rev()
            .filter(|entry| entry.actor_identity == actor_identity)
            .filter_map(|entry| entry.actor_display_name.as_deref())
            .map(str::trim)
            .find(|name| !name.is_empty())
            .map(str::to_string))
    }
}
