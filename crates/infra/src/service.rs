//! Access-control service: the entry point for the request layer.
//!
//! Wraps the resolver, directory and audit recorder around one override store
//! and one audit log. Policy mutations are gated on `canManageAccessPolicy`,
//! validated, applied, and then recorded under the `access-control` area.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tracing::info;

use muster_auth::{
    authorize, capabilities_of, ensure_removable, explain, AccessExplanation, BootstrapRegistry,
    Capability, CapabilitySet, Resolution, Role,
};
use muster_core::{AccessError, AccessResult, Identity};

use crate::audit::{AuditEntry, AuditLog, AuditQuery, AuditRecorder, NewAuditEntry};
use crate::directory::{Directory, DirectoryEntry};
use crate::error::bounded;
use crate::names::NameSource;
use crate::overrides::{AccessEntry, OverrideStore, OverrideUpsert};
use crate::resolver::RoleResolver;

pub const ACCESS_CONTROL_AREA: &str = "access-control";
pub const UPSERT_ROLE_ACTION: &str = "upsert-role";
pub const REMOVE_ROLE_ACTION: &str = "remove-role";

/// The verified caller of a privileged operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub identity: Identity,
    pub display_name: Option<String>,
    pub resolution: Resolution,
}

impl Actor {
    /// Audit entry attributed to this actor.
    pub fn audit(&self, area: &str, action: &str) -> NewAuditEntry {
        NewAuditEntry::new(self.identity.as_str(), area, action)
            .with_actor_display_name(self.display_name.clone())
            .with_actor_role(self.resolution.role.map(|role| role.as_str().to_string()))
    }

    fn require(&self, capability: Capability) -> AccessResult<()> {
        authorize(&self.resolution, capability)
    }
}

pub struct AccessControl<S, L> {
    registry: Arc<BootstrapRegistry>,
    overrides: S,
    resolver: RoleResolver<S>,
    directory: Directory<S>,
    audit: AuditRecorder<L>,
    timeout: Duration,
}

impl<S, L> AccessControl<S, L>
where
    S: OverrideStore + Clone,
    L: AuditLog,
{
    /// `names` are the side lookups used to fill missing directory names,
    /// in priority order.
    pub fn new(
        registry: BootstrapRegistry,
        overrides: S,
        audit_log: L,
        names: Vec<Arc<dyn NameSource>>,
        timeout: Duration,
    ) -> Self {
        let registry = Arc::new(registry);
        Self {
            resolver: RoleResolver::new(registry.clone(), overrides.clone(), timeout),
            directory: Directory::new(registry.clone(), overrides.clone(), names, timeout),
            audit: AuditRecorder::new(audit_log, timeout),
            registry,
            overrides,
            timeout,
        }
    }

    pub fn registry(&self) -> &BootstrapRegistry {
        &self.registry
    }

    pub fn audit_log(&self) -> &L {
        self.audit.log()
    }

    // Resolution

    pub async fn resolve(&self, identity: &Identity) -> Resolution {
        self.resolver.resolve(identity).await
    }

    pub async fn resolve_raw(&self, raw: Option<&str>) -> Resolution {
        self.resolver.resolve_raw(raw).await
    }

    pub async fn try_resolve(&self, identity: &Identity) -> AccessResult<Resolution> {
        self.resolver.try_resolve(identity).await
    }

    pub fn capabilities_of(&self, role: Option<Role>) -> CapabilitySet {
        capabilities_of(role)
    }

    pub async fn authorize(&self, identity: &Identity, capability: Capability) -> AccessResult<Resolution> {
        self.resolver.authorize(identity, capability).await
    }

    pub async fn explain(&self, identity: &Identity, capability: Capability) -> AccessExplanation {
        explain(&self.resolve(identity).await, capability)
    }

    /// Resolve `identity` into an actor for the privileged calls below.
    pub async fn actor(&self, identity: Identity, display_name: Option<String>) -> Actor {
        let resolution = self.resolve(&identity).await;
        Actor {
            identity,
            display_name,
            resolution,
        }
    }

    // Policy mutations

    /// Create or update the override row for `identity_raw`.
    pub async fn upsert_role(
        &self,
        actor: &Actor,
        identity_raw: &str,
        role_raw: &str,
        display_name: Option<&str>,
    ) -> AccessResult<AccessEntry> {
        actor.require(Capability::CanManageAccessPolicy)?;
        let identity = Identity::parse(identity_raw)?;
        let role: Role = role_raw.parse()?;

        let previous = bounded(self.timeout, "get_override", self.overrides.get(&identity)).await?;
        let request = OverrideUpsert::new(identity, role, display_name, actor.identity.clone());
        let entry = bounded(self.timeout, "upsert_override", self.overrides.upsert(request)).await?;

        info!(
            actor = %actor.identity,
            target = %entry.identity,
            role = %entry.role,
            "access override upserted"
        );

        self.audit
            .record(
                actor
                    .audit(ACCESS_CONTROL_AREA, UPSERT_ROLE_ACTION)
                    .with_target(entry.identity.as_str())
                    .with_metadata(json!({
                        "role": entry.role,
                        "previousRole": previous.map(|p| p.role),
                        "displayName": entry.display_name,
                    })),
            )
            .await;

        Ok(entry)
    }

    /// Delete the override row for `identity_raw`.
    ///
    /// Bootstrap identities are refused with `ProtectedIdentity` before the
    /// store is touched. Returns whether a row existed.
    pub async fn remove_role(&self, actor: &Actor, identity_raw: &str) -> AccessResult<bool> {
        actor.require(Capability::CanManageAccessPolicy)?;
        let identity = Identity::parse(identity_raw)?;
        ensure_removable(&self.registry, &identity)?;

        let previous = bounded(self.timeout, "get_override", self.overrides.get(&identity)).await?;
        if previous.is_none() {
            return Ok(false);
        }
        let removed = bounded(self.timeout, "remove_override", self.overrides.remove(&identity)).await?;
        if !removed {
            return Ok(false);
        }

        info!(actor = %actor.identity, target = %identity, "access override removed");

        self.audit
            .record(
                actor
                    .audit(ACCESS_CONTROL_AREA, REMOVE_ROLE_ACTION)
                    .with_target(identity.as_str())
                    .with_metadata(json!({
                        "previousRole": previous.map(|p| p.role),
                    })),
            )
            .await;

        Ok(true)
    }

    /// `remove_role`, with a missing row reported as `NotFound`.
    pub async fn remove_role_strict(&self, actor: &Actor, identity_raw: &str) -> AccessResult<()> {
        if self.remove_role(actor, identity_raw).await? {
            Ok(())
        } else {
            Err(AccessError::not_found())
        }
    }

    // Reads

    pub async fn list_directory(&self, actor: &Actor) -> AccessResult<Vec<DirectoryEntry>> {
        actor.require(Capability::CanManageAccessPolicy)?;
        self.directory.list().await
    }

    pub async fn query_audit(&self, actor: &Actor, query: &AuditQuery) -> AccessResult<Vec<AuditEntry>> {
        actor.require(Capability::CanViewAuditLog)?;
        self.audit.query(query).await
    }

    // Audit

    /// Best-effort audit append for any privileged action.
    pub async fn record(&self, entry: NewAuditEntry) {
        self.audit.record(entry).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use muster_auth::RoleOrigin;

    use crate::audit::InMemoryAuditLog;
    use crate::error::StoreError;
    use crate::names::{AuditActivityNames, InMemoryNameSource};
    use crate::overrides::InMemoryOverrideStore;

    const SENIOR: &str = "100000000000000000";
    const MANAGER: &str = "100000000000000001";
    const NEWCOMER: &str = "100000000000000002";

    fn id(raw: &str) -> Identity {
        Identity::parse(raw).unwrap()
    }

    type Service = AccessControl<Arc<InMemoryOverrideStore>, Arc<InMemoryAuditLog>>;

    fn service() -> (Service, Arc<InMemoryOverrideStore>, Arc<InMemoryAuditLog>) {
        let store = InMemoryOverrideStore::arc();
        let log = InMemoryAuditLog::arc();
        let control = AccessControl::new(
            BootstrapRegistry::compiled(),
            store.clone(),
            log.clone(),
            vec![Arc::new(AuditActivityNames::new(log.clone()))],
            Duration::from_millis(200),
        );
        (control, store, log)
    }

    /// Counts store calls on top of an in-memory store.
    #[derive(Default)]
    struct CountingStore {
        inner: InMemoryOverrideStore,
        calls: AtomicUsize,
    }

    impl CountingStore {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn tick(&self) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl OverrideStore for CountingStore {
        async fn get(&self, identity: &Identity) -> Result<Option<AccessEntry>, StoreError> {
            self.tick();
            self.inner.get(identity).await
        }

        async fn upsert(&self, request: OverrideUpsert) -> Result<AccessEntry, StoreError> {
            self.tick();
            self.inner.upsert(request).await
        }

        async fn remove(&self, identity: &Identity) -> Result<bool, StoreError> {
            self.tick();
            self.inner.remove(identity).await
        }

        async fn list(&self) -> Result<Vec<AccessEntry>, StoreError> {
            self.tick();
            self.inner.list().await
        }
    }

    struct BrokenLog;

    #[async_trait]
    impl AuditLog for BrokenLog {
        async fn append(&self, _entry: NewAuditEntry) -> Result<AuditEntry, StoreError> {
            Err(StoreError::Unavailable("disk full".into()))
        }

        async fn query(&self, _query: &AuditQuery) -> Result<Vec<AuditEntry>, StoreError> {
            Err(StoreError::Unavailable("disk full".into()))
        }

        async fn latest_display_name(&self, _actor: &str) -> Result<Option<String>, StoreError> {
            Err(StoreError::Unavailable("disk full".into()))
        }
    }

    #[tokio::test]
    async fn bootstrap_manager_resolves_from_registry() {
        let (control, _, _) = service();
        let resolution = control.resolve(&id(MANAGER)).await;
        assert_eq!(resolution.role, Some(Role::Manager));
        assert_eq!(resolution.source, RoleOrigin::Bootstrap);
    }

    #[tokio::test]
    async fn upsert_then_resolve_reports_override() {
        let (control, _, log) = service();
        let actor = control.actor(id(MANAGER), Some("Grace".to_string())).await;

        let entry = control.upsert_role(&actor, NEWCOMER, "staff", Some("Ada")).await.unwrap();
        assert_eq!(entry.role, Role::Staff);
        assert_eq!(entry.added_by.as_deref(), Some(MANAGER));

        let resolution = control.resolve(&id(NEWCOMER)).await;
        assert_eq!(resolution, Resolution::from_override(Role::Staff));

        let rows = log.query(&AuditQuery::default()).await.unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.area, ACCESS_CONTROL_AREA);
        assert_eq!(row.action, UPSERT_ROLE_ACTION);
        assert_eq!(row.target.as_deref(), Some(NEWCOMER));
        assert_eq!(row.actor_identity, MANAGER);
        assert_eq!(row.actor_display_name.as_deref(), Some("Grace"));
        assert_eq!(row.actor_role.as_deref(), Some("manager"));
        assert_eq!(
            row.metadata,
            Some(json!({"role": "staff", "previousRole": null, "displayName": "Ada"}))
        );
    }

    #[tokio::test]
    async fn promotion_records_previous_role() {
        let (control, _, log) = service();
        let actor = control.actor(id(MANAGER), None).await;
        control.upsert_role(&actor, NEWCOMER, "staff", None).await.unwrap();
        control.upsert_role(&actor, NEWCOMER, "manager", None).await.unwrap();

        let rows = log.query(&AuditQuery::default().with_limit(1)).await.unwrap();
        assert_eq!(
            rows[0].metadata,
            Some(json!({"role": "manager", "previousRole": "staff", "displayName": null}))
        );
    }

    #[tokio::test]
    async fn malformed_identity_is_rejected_without_a_row() {
        let (control, store, log) = service();
        let actor = control.actor(id(MANAGER), None).await;

        for raw in ["abc", " 100000000000000002 "] {
            let err = control.upsert_role(&actor, raw, "staff", None).await.unwrap_err();
            assert!(matches!(err, AccessError::InvalidIdentity(_)), "{raw:?}");
        }
        assert!(store.list().await.unwrap().is_empty());
        assert!(log.is_empty());
    }

    #[tokio::test]
    async fn unknown_role_is_rejected() {
        let (control, store, _) = service();
        let actor = control.actor(id(MANAGER), None).await;

        let err = control.upsert_role(&actor, NEWCOMER, "owner", None).await.unwrap_err();
        assert!(matches!(err, AccessError::InvalidRole(_)));
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn staff_cannot_change_policy() {
        let (control, store, _) = service();
        let manager = control.actor(id(MANAGER), None).await;
        control.upsert_role(&manager, NEWCOMER, "staff", None).await.unwrap();

        let staff = control.actor(id(NEWCOMER), None).await;
        assert_eq!(
            control.upsert_role(&staff, "100000000000000003", "manager", None).await,
            Err(AccessError::forbidden("canManageAccessPolicy"))
        );
        assert_eq!(store.list().await.unwrap().len(), 1);

        let anonymous = control.actor(id("999999999999999999"), None).await;
        assert!(matches!(
            control.list_directory(&anonymous).await,
            Err(AccessError::Forbidden(_))
        ));
        assert!(matches!(
            control.query_audit(&staff, &AuditQuery::default()).await,
            Err(AccessError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn bootstrap_removal_is_refused_before_any_store_call() {
        let store = Arc::new(CountingStore::default());
        let control = AccessControl::new(
            BootstrapRegistry::compiled(),
            store.clone(),
            InMemoryAuditLog::arc(),
            Vec::new(),
            Duration::from_millis(200),
        );
        let actor = control.actor(id(SENIOR), None).await;
        let before = store.calls();

        assert_eq!(
            control.remove_role(&actor, MANAGER).await,
            Err(AccessError::protected(MANAGER))
        );
        assert_eq!(store.calls(), before);
        assert!(control.audit_log().is_empty());
    }

    #[tokio::test]
    async fn remove_deletes_the_row_and_audits() {
        let (control, store, log) = service();
        let actor = control.actor(id(MANAGER), None).await;
        control.upsert_role(&actor, NEWCOMER, "staff", None).await.unwrap();

        assert_eq!(control.remove_role(&actor, NEWCOMER).await, Ok(true));
        assert!(store.get(&id(NEWCOMER)).await.unwrap().is_none());
        assert_eq!(control.resolve(&id(NEWCOMER)).await, Resolution::NONE);

        let rows = log
            .query(&AuditQuery::default().with_action(REMOVE_ROLE_ACTION))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].metadata, Some(json!({"previousRole": "staff"})));
    }

    #[tokio::test]
    async fn removing_a_missing_row() {
        let (control, _, log) = service();
        let actor = control.actor(id(MANAGER), None).await;

        assert_eq!(control.remove_role(&actor, NEWCOMER).await, Ok(false));
        assert_eq!(
            control.remove_role_strict(&actor, NEWCOMER).await,
            Err(AccessError::NotFound)
        );
        assert!(log.is_empty());
    }

    #[tokio::test]
    async fn audit_failures_do_not_fail_the_mutation() {
        let store = InMemoryOverrideStore::arc();
        let control = AccessControl::new(
            BootstrapRegistry::compiled(),
            store.clone(),
            BrokenLog,
            Vec::new(),
            Duration::from_millis(200),
        );
        let actor = control.actor(id(MANAGER), None).await;

        let entry = control.upsert_role(&actor, NEWCOMER, "staff", None).await.unwrap();
        assert_eq!(entry.role, Role::Staff);
        assert_eq!(control.remove_role(&actor, NEWCOMER).await, Ok(true));
    }

    #[tokio::test]
    async fn demoted_bootstrap_manager_loses_policy_rights() {
        let (control, _, _) = service();
        let senior = control.actor(id(SENIOR), None).await;
        control.upsert_role(&senior, MANAGER, "staff", None).await.unwrap();

        let demoted = control.actor(id(MANAGER), None).await;
        assert_eq!(demoted.resolution, Resolution::from_override(Role::Staff));
        assert!(control.list_directory(&demoted).await.is_err());
    }

    #[tokio::test]
    async fn directory_uses_audit_activity_names() {
        let (control, _, _) = service();
        let actor = control.actor(id(MANAGER), Some("Grace".to_string())).await;
        control.upsert_role(&actor, NEWCOMER, "staff", None).await.unwrap();

        let entries = control.list_directory(&actor).await.unwrap();
        let identities: Vec<&str> = entries.iter().map(|e| e.identity.as_str()).collect();
        assert_eq!(identities, vec![SENIOR, MANAGER, NEWCOMER]);
        assert_eq!(entries[1].display_name.as_deref(), Some("Grace"));
        assert_eq!(entries[2].display_name, None);
    }

    #[tokio::test]
    async fn side_name_sources_are_consulted_in_order() {
        let names = Arc::new(InMemoryNameSource::new());
        names.remember(id(SENIOR), "founder");
        let control = AccessControl::new(
            BootstrapRegistry::compiled(),
            InMemoryOverrideStore::arc(),
            InMemoryAuditLog::arc(),
            vec![names],
            Duration::from_millis(200),
        );
        let actor = control.actor(id(SENIOR), None).await;

        let entries = control.list_directory(&actor).await.unwrap();
        assert_eq!(entries[0].display_name.as_deref(), Some("founder"));
    }

    #[tokio::test]
    async fn audit_query_by_area_is_newest_first_and_bounded() {
        let (control, _, _) = service();
        let actor = control.actor(id(MANAGER), None).await;
        for n in 2..8 {
            control
                .upsert_role(&actor, &format!("10000000000000000{n}"), "staff", None)
                .await
                .unwrap();
        }
        control
            .record(actor.audit("knowledge", "delete").with_target("article-1"))
            .await;

        let rows = control
            .query_audit(&actor, &AuditQuery::default().with_area(ACCESS_CONTROL_AREA).with_limit(3))
            .await
            .unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.area == ACCESS_CONTROL_AREA));
        assert!(rows.windows(2).all(|w| w[0].id > w[1].id));
        assert_eq!(rows[0].target.as_deref(), Some("100000000000000007"));
    }

    #[tokio::test]
    async fn explain_reports_the_origin() {
        let (control, _, _) = service();
        let explanation = control.explain(&id(MANAGER), Capability::CanManageAccessPolicy).await;
        assert!(explanation.granted);
        assert_eq!(explanation.source, RoleOrigin::Bootstrap);

        let explanation = control.explain(&id(NEWCOMER), Capability::CanOpenPanel).await;
        assert!(!explanation.granted);
        assert_eq!(explanation.role, None);
    }

    #[test]
    fn capabilities_follow_the_matrix() {
        let (control, _, _) = service();
        assert!(!control.capabilities_of(Some(Role::Staff)).allows(Capability::CanManageAccessPolicy));
        assert_eq!(control.capabilities_of(Some(Role::Manager)), CapabilitySet::all());
        assert_eq!(control.capabilities_of(Some(Role::SeniorAdmin)), CapabilitySet::all());
        assert_eq!(control.capabilities_of(None), CapabilitySet::none());
    }
}
