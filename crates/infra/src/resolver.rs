//! Role resolution: override store first, bootstrap registry second.
//!
//! ## Failure policy
//!
//! `try_resolve` surfaces store failures as `StoreUnavailable`. `resolve`
//! fails closed: any store error or timeout yields `Resolution::NONE`, so an
//! unreachable store can never grant (or retain) a privilege.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use muster_auth::{BootstrapRegistry, Capability, Resolution, Role, RoleOrigin};
use muster_core::{AccessResult, Identity};

use crate::error::{bounded, StoreError};
use crate::overrides::OverrideStore;

/// One provider of role assignments.
#[async_trait]
pub trait RoleSource: Send + Sync {
    /// Tag attached to any role this source reports.
    fn origin(&self) -> RoleOrigin;

    async fn role_of(&self, identity: &Identity) -> Result<Option<Role>, StoreError>;
}

/// Deploy-time registry. Never fails.
#[derive(Debug, Clone)]
pub struct BootstrapSource {
    registry: Arc<BootstrapRegistry>,
}

impl BootstrapSource {
    pub fn new(registry: Arc<BootstrapRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &BootstrapRegistry {
        &self.registry
    }
}

#[async_trait]
impl RoleSource for BootstrapSource {
    fn origin(&self) -> RoleOrigin {
        RoleOrigin::Bootstrap
    }

    async fn role_of(&self, identity: &Identity) -> Result<Option<Role>, StoreError> {
        Ok(self.registry.role_of(identity))
    }
}

/// Persisted overrides.
#[derive(Debug, Clone)]
pub struct OverrideSource<S> {
    store: S,
}

impl<S: OverrideStore> OverrideSource<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<S: OverrideStore> RoleSource for OverrideSource<S> {
    fn origin(&self) -> RoleOrigin {
        RoleOrigin::Override
    }

    async fn role_of(&self, identity: &Identity) -> Result<Option<Role>, StoreError> {
        Ok(self.store.get(identity).await?.map(|entry| entry.role))
    }
}

#[derive(Debug, Clone)]
pub struct RoleResolver<S> {
    overrides: OverrideSource<S>,
    bootstrap: BootstrapSource,
    timeout: Duration,
}

impl<S: OverrideStore> RoleResolver<S> {
    pub fn new(registry: Arc<BootstrapRegistry>, store: S, timeout: Duration) -> Self {
        Self {
            overrides: OverrideSource::new(store),
            bootstrap: BootstrapSource::new(registry),
            timeout,
        }
    }

    pub fn registry(&self) -> &BootstrapRegistry {
        self.bootstrap.registry()
    }

    /// Providers in priority order: overrides, then the bootstrap registry.
    fn sources(&self) -> [&dyn RoleSource; 2] {
        [&self.overrides, &self.bootstrap]
    }

    /// Resolve, surfacing store failures.
    ///
    /// The first source that knows the identity decides; later sources are
    /// not consulted.
    pub async fn try_resolve(&self, identity: &Identity) -> AccessResult<Resolution> {
        let mut resolution = Resolution::NONE;
        for source in self.sources() {
            let role = bounded(self.timeout, "resolve_role", source.role_of(identity)).await?;
            if let Some(role) = role {
                resolution = Resolution::granted(role, source.origin());
                break;
            }
        }

        debug!(
            %identity,
            role = resolution.role.map(|r| r.as_str()).unwrap_or("none"),
            source = %resolution.source,
            "resolved role"
        );
        Ok(resolution)
    }

    /// Resolve, failing closed on any store failure.
    pub async fn resolve(&self, identity: &Identity) -> Resolution {
        match self.try_resolve(identity).await {
            Ok(resolution) => resolution,
            Err(err) => {
                warn!(%identity, error = %err, "role resolution failed; treating as no role");
                Resolution::NONE
            }
        }
    }

    /// Resolve an unvalidated identity from the authentication boundary.
    ///
    /// Missing or malformed identities resolve to `Resolution::NONE`.
    pub async fn resolve_raw(&self, raw: Option<&str>) -> Resolution {
        match Identity::from_optional(raw) {
            Some(identity) => self.resolve(&identity).await,
            None => Resolution::NONE,
        }
    }

    /// Resolve and require `capability`.
    pub async fn authorize(&self, identity: &Identity, capability: Capability) -> AccessResult<Resolution> {
        let resolution = self.resolve(identity).await;
        if let Err(err) = muster_auth::authorize(&resolution, capability) {
            warn!(%identity, capability = capability.as_str(), "access denied");
            return Err(err);
        }
        Ok(resolution)
    }
}
