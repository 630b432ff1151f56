//! Infrastructure layer: stores, resolution, directory, audit, config.
//!
//! Everything that touches IO lives here. The pure policy (roles,
//! capabilities, precedence) is in `muster-auth`.

pub mod audit;
pub mod config;
pub mod db;
pub mod directory;
pub mod error;
pub mod names;
pub mod overrides;
pub mod resolver;
pub mod service;

pub use audit::{AuditEntry, AuditLog, AuditQuery, AuditRecorder, InMemoryAuditLog, NewAuditEntry, PostgresAuditLog};
pub use config::{AccessConfig, ConfigError, SubmissionNamesConfig};
pub use directory::{Directory, DirectoryEntry};
pub use error::{StoreError, DEFAULT_STORE_TIMEOUT};
pub use names::{AuditActivityNames, InMemoryNameSource, NameSource, PostgresSubmissionNames};
pub use overrides::{AccessEntry, InMemoryOverrideStore, OverrideStore, OverrideUpsert, PostgresOverrideStore};
pub use resolver::{BootstrapSource, OverrideSource, RoleResolver, RoleSource};
pub use service::{AccessControl, Actor};
