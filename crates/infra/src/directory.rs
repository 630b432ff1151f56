//! Directory merge: the full roster of privileged identities.
//!
//! Bootstrap identities and override rows are unioned (override wins on
//! collision), missing display names are filled from the name sources, and
//! the result is ordered by descending role rank, then ascending identity.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use muster_auth::{BootstrapRegistry, Role, RoleOrigin};
use muster_core::{AccessResult, Identity};

use crate::error::bounded;
use crate::names::{first_display_name, NameSource};
use crate::overrides::{AccessEntry, OverrideStore};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryEntry {
    pub identity: Identity,
    pub display_name: Option<String>,
    pub role: Role,
    pub source: RoleOrigin,
    pub added_by: Option<String>,
    pub updated_by: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl DirectoryEntry {
    fn from_bootstrap(identity: Identity, role: Role) -> Self {
        Self {
            identity,
            display_name: None,
            role,
            source: RoleOrigin::Bootstrap,
            added_by: None,
            updated_by: None,
            created_at: None,
            updated_at: None,
        }
    }
}

impl From<AccessEntry> for DirectoryEntry {
    fn from(entry: AccessEntry) -> Self {
        Self {
            identity: entry.identity,
            display_name: entry.display_name,
            role: entry.role,
            source: RoleOrigin::Override,
            added_by: entry.added_by,
            updated_by: entry.updated_by,
            created_at: Some(entry.created_at),
            updated_at: Some(entry.updated_at),
        }
    }
}

/// Rank descending, then identity ascending. Total and deterministic.
pub fn sort_directory(entries: &mut [DirectoryEntry]) {
    entries.sort_by(|a, b| {
        b.role
            .rank()
            .cmp(&a.role.rank())
            .then_with(|| a.identity.cmp(&b.identity))
    });
}

/// Union of bootstrap entries and override rows, sorted.
pub fn merge_directory(registry: &BootstrapRegistry, overrides: Vec<AccessEntry>) -> Vec<DirectoryEntry> {
    let mut merged: BTreeMap<Identity, DirectoryEntry> = registry
        .entries()
        .into_iter()
        .map(|(identity, role)| (identity.clone(), DirectoryEntry::from_bootstrap(identity, role)))
        .collect();

    for row in overrides {
        merged.insert(row.identity.clone(), row.into());
    }

    let mut entries: Vec<DirectoryEntry> = merged.into_values().collect();
    sort_directory(&mut entries);
    entries
}

pub struct Directory<S> {
    registry: Arc<BootstrapRegistry>,
    overrides: S,
    names: Vec<Arc<dyn NameSource>>,
    timeout: Duration,
}

impl<S: OverrideStore> Directory<S> {
    /// `names` are consulted in order for entries without a stored name.
    pub fn new(
        registry: Arc<BootstrapRegistry>,
        overrides: S,
        names: Vec<Arc<dyn NameSource>>,
        timeout: Duration,
    ) -> Self {
        Self {
            registry,
            overrides,
            names,
            timeout,
        }
    }

    /// Merged, enriched, ordered roster.
    ///
    /// Fails only when the override table cannot be read; name lookups fail open.
    pub async fn list(&self) -> AccessResult<Vec<DirectoryEntry>> {
        let rows = bounded(self.timeout, "list_overrides", self.overrides.list()).await?;
        let mut entries = merge_directory(&self.registry, rows);

        for entry in entries.iter_mut().filter(|e| e.display_name.is_none()) {
            entry.display_name = first_display_name(&self.names, &entry.identity, self.timeout).await;
        }

        debug!(entries = entries.len(), "directory listed");
        Ok(entries)
    }
}
