//! Override store abstraction and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use muster_auth::Role;
use muster_core::Identity;

use crate::error::StoreError;

/// A persisted role assignment that supersedes the bootstrap registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessEntry {
    pub identity: Identity,
    pub display_name: Option<String>,
    pub role: Role,
    /// Actor who first created the row (kept across updates).
    pub added_by: Option<String>,
    /// Actor of the most recent write.
    pub updated_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for `OverrideStore::upsert`.
///
/// Holds already-validated values; raw request strings are parsed before one
/// of these can be built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideUpsert {
    pub identity: Identity,
    pub role: Role,
    pub display_name: Option<String>,
    pub actor: Identity,
}

impl OverrideUpsert {
    pub fn new(identity: Identity, role: Role, display_name: Option<&str>, actor: Identity) -> Self {
        let display_name = display_name
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        Self {
            identity,
            role,
            display_name,
            actor,
        }
    }
}

/// Persisted identity → role table.
///
/// ## Write semantics
///
/// - `upsert` is a single-row atomic write. On conflict it replaces role,
///   display_name, updated_by and updated_at; created_at and added_by keep
///   their first-insert values.
/// - `remove` deletes a single row and reports whether one existed.
/// - There is no cross-row atomicity.
///
/// The store knows nothing about bootstrap identities; the deletion guard is
/// applied by callers before `remove`.
#[async_trait]
pub trait OverrideStore: Send + Sync {
    async fn get(&self, identity: &Identity) -> Result<Option<AccessEntry>, StoreError>;

    async fn upsert(&self, request: OverrideUpsert) -> Result<AccessEntry, StoreError>;

    async fn remove(&self, identity: &Identity) -> Result<bool, StoreError>;

    /// All rows, in no particular order.
    async fn list(&self) -> Result<Vec<AccessEntry>, StoreError>;
}

#[async_trait]
impl<S> OverrideStore for Arc<S>
where
    S: OverrideStore + ?Sized,
{
    async fn get(&self, identity: &Identity) -> Result<Option<AccessEntry>, StoreError> {
        (**self).get(identity).await
    }

    async fn upsert(&self, request: OverrideUpsert) -> Result<AccessEntry, StoreError> {
        (**self).upsert(request).await
    }

    async fn remove(&self, identity: &Identity) -> Result<bool, StoreError> {
        (**self).remove(identity).await
    }

    async fn list(&self) -> Result<Vec<AccessEntry>, StoreError> {
        (**self).list().await
    }
}

/// In-memory override store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryOverrideStore {
    rows: RwLock<HashMap<Identity, AccessEntry>>,
}

impl InMemoryOverrideStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    fn poisoned() -> StoreError {
        StoreError::Unavailable("override store lock poisoned".to_string())
    }
}

#[async_trait]
impl OverrideStore for InMemoryOverrideStore {
    async fn get(&self, identity: &Identity) -> Result<Option<AccessEntry>, StoreError> {
        let rows = self.rows.read().map_err(|_| Self::poisoned())?;
        Ok(rows.get(identity).cloned())
    }

    async fn upsert(&self, request: OverrideUpsert) -> Result<AccessEntry, StoreError> {
        let mut rows = self.rows.write().map_err(|_| Self::poisoned())?;
        let now = Utc::now();
        let actor = request.actor.to_string();

        let entry = match rows.get(&request.identity) {
            Some(existing) => AccessEntry {
                identity: request.identity.clone(),
                display_name: request.display_name,
                role: request.role,
                added_by: existing.added_by.clone(),
                updated_by: Some(actor),
                created_at: existing.created_at,
                // Keep updated_at strictly increasing per row even when the
                // clock does not advance between two writes.
                updated_at: now.max(existing.updated_at + Duration::microseconds(1)),
            },
            None => AccessEntry {
                identity: request.identity.clone(),
                display_name: request.display_name,
                role: request.role,
                added_by: Some(actor.clone()),
                updated_by: Some(actor),
                created_at: now,
                updated_at: now,
            },
        };

        rows.insert(request.identity, entry.clone());
        Ok(entry)
    }

    async fn remove(&self, identity: &Identity) -> Result<bool, StoreError> {
        let mut rows = self.rows.write().map_err(|_| Self::poisoned())?;
        Ok(rows.remove(identity).is_some())
    }

    async fn list(&self) -> Result<Vec<AccessEntry>, StoreError> {
        let rows = self.rows.read().map_err(|_| Self::poisoned())?;
        Ok(rows.values().cloned().collect())
    }
}
