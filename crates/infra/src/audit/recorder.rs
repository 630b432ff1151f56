//! Best-effort audit recording.
//!
//! Auditing is observability, not a transactional participant: `record`
//! never returns an error and never blocks longer than the store timeout.

use std::time::Duration;

use tracing::{debug, error};

use muster_core::AccessResult;

use super::store::AuditLog;
use super::types::{AuditEntry, AuditQuery, NewAuditEntry};
use crate::error::bounded;

#[derive(Debug, Clone)]
pub struct AuditRecorder<L> {
    log: L,
    timeout: Duration,
}

impl<L> AuditRecorder<L>
where
    L: AuditLog,
{
    pub fn new(log: L, timeout: Duration) -> Self {
        Self { log, timeout }
    }

    pub fn log(&self) -> &L {
        &self.log
    }

    /// Append `entry`, swallowing every failure.
    ///
    /// Entries missing an actor, area or action are dropped silently.
    pub async fn record(&self, entry: NewAuditEntry) {
        if !entry.is_complete() {
            debug!(
                area = %entry.area,
                action = %entry.action,
                "audit entry missing required fields; skipped"
            );
            return;
        }

        let area = entry.area.clone();
        let action = entry.action.clone();
        match bounded(self.timeout, "append_audit", self.log.append(entry)).await {
            Ok(stored) => debug!(audit_id = stored.id, %area, %action, "audit entry recorded"),
            Err(err) => error!(error = %err, %area, %action, "audit write failed"),
        }
    }

    /// Filtered retrieval, newest first. Store failures surface as
    /// `StoreUnavailable`.
    pub async fn query(&self, query: &AuditQuery) -> AccessResult<Vec<AuditEntry>> {
        Ok(bounded(self.timeout, "query_audit", self.log.query(query)).await?)
    }
}
