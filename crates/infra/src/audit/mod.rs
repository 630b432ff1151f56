//! Append-only audit trail of privileged actions.

pub mod postgres;
pub mod recorder;
pub mod store;
pub mod types;

pub use postgres::PostgresAuditLog;
pub use recorder::AuditRecorder;
pub use store::{AuditLog, InMemoryAuditLog};
pub use types::{AuditEntry, AuditQuery, NewAuditEntry, DEFAULT_AUDIT_LIMIT, MAX_AUDIT_LIMIT};
