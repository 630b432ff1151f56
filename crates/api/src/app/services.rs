//! Service wiring: which stores back the access-control engine.
//!
//! With `DATABASE_URL` set the Postgres adapters are used (schema applied on
//! start); otherwise everything runs in memory, which is what tests and local
//! runs use.

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use muster_infra::{
    db, AccessConfig, AccessControl, AuditActivityNames, AuditLog, InMemoryAuditLog,
    InMemoryOverrideStore, NameSource, OverrideStore, PostgresAuditLog, PostgresOverrideStore,
    PostgresSubmissionNames,
};

pub type SharedOverrides = Arc<dyn OverrideStore>;
pub type SharedAuditLog = Arc<dyn AuditLog>;
pub type AccessService = AccessControl<SharedOverrides, SharedAuditLog>;

pub struct AppServices {
    pub access: AccessService,
}

pub async fn build_services(config: &AccessConfig) -> anyhow::Result<AppServices> {
    match config.database_url.as_deref() {
        Some(url) => build_persistent_services(config, url).await,
        None => {
            warn!("DATABASE_URL not set; using in-memory stores");
            Ok(build_in_memory_services(config))
        }
    }
}

/// In-memory stores; name enrichment comes from audit activity only.
pub fn build_in_memory_services(config: &AccessConfig) -> AppServices {
    let overrides: SharedOverrides = InMemoryOverrideStore::arc();
    let audit: SharedAuditLog = InMemoryAuditLog::arc();
    let names: Vec<Arc<dyn NameSource>> = vec![Arc::new(AuditActivityNames::new(audit.clone()))];

    assemble(config, overrides, audit, names)
}

async fn build_persistent_services(config: &AccessConfig, database_url: &str) -> anyhow::Result<AppServices> {
    let pool = db::connect(config, database_url)
        .await
        .context("failed to connect to Postgres")?;
    db::migrate(&pool)
        .await
        .context("failed to apply access-control schema")?;

    let overrides: SharedOverrides = Arc::new(PostgresOverrideStore::new(pool.clone()));
    let audit: SharedAuditLog = Arc::new(PostgresAuditLog::new(pool.clone()));
    let submissions = PostgresSubmissionNames::new(pool, &config.submissions)
        .context("invalid submission-name lookup configuration")?;
    let names: Vec<Arc<dyn NameSource>> = vec![
        Arc::new(AuditActivityNames::new(audit.clone())),
        Arc::new(submissions),
    ];

    info!("using Postgres-backed stores");
    Ok(assemble(config, overrides, audit, names))
}

fn assemble(
    config: &AccessConfig,
    overrides: SharedOverrides,
    audit: SharedAuditLog,
    names: Vec<Arc<dyn NameSource>>,
) -> AppServices {
    info!(
        bootstrap_identities = config.bootstrap.len(),
        store_timeout_ms = config.store_timeout.as_millis() as u64,
        "access control ready"
    );
    AppServices {
        access: AccessControl::new(
            config.bootstrap.clone(),
            overrides,
            audit,
            names,
            config.store_timeout,
        ),
    }
}
