use serde::{Deserialize, Serialize};

use muster_core::{AccessError, AccessResult, Identity};

use crate::{BootstrapRegistry, Capability, CapabilitySet, Role};

/// Where an effective role came from.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleOrigin {
    /// A persisted override row.
    Override,
    /// The deploy-time bootstrap registry.
    Bootstrap,
    /// No role applies.
    None,
}

impl RoleOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoleOrigin::Override => "override",
            RoleOrigin::Bootstrap => "bootstrap",
            RoleOrigin::None => "none",
        }
    }
}

impl core::fmt::Display for RoleOrigin {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Effective role of an identity and where it came from.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub role: Option<Role>,
    pub source: RoleOrigin,
}

impl Resolution {
    /// Unknown, unauthenticated, or fail-closed.
    pub const NONE: Resolution = Resolution {
        role: None,
        source: RoleOrigin::None,
    };

    /// `role` as reported by the provider tagged `source`.
    pub fn granted(role: Role, source: RoleOrigin) -> Self {
        match source {
            RoleOrigin::None => Self::NONE,
            source => Self {
                role: Some(role),
                source,
            },
        }
    }

    pub fn from_override(role: Role) -> Self {
        Self::granted(role, RoleOrigin::Override)
    }

    pub fn from_bootstrap(role: Role) -> Self {
        Self::granted(role, RoleOrigin::Bootstrap)
    }

    pub fn capabilities(&self) -> CapabilitySet {
        capabilities_of(self.role)
    }

    pub fn allows(&self, capability: Capability) -> bool {
        self.capabilities().allows(capability)
    }
}

/// Capability set for an (optional) role.
pub fn capabilities_of(role: Option<Role>) -> CapabilitySet {
    CapabilitySet::for_role(role)
}

/// Gate a single capability.
///
/// - No IO
/// - No panics
pub fn authorize(resolution: &Resolution, required: Capability) -> AccessResult<()> {
    if resolution.allows(required) {
        Ok(())
    } else {
        Err(AccessError::forbidden(required.as_str()))
    }
}

/// Deletion guard for override removal.
///
/// Bootstrap identities can never be locked out by a database-only action, so
/// removal of one is refused before the store is consulted.
pub fn ensure_removable(registry: &BootstrapRegistry, identity: &Identity) -> AccessResult<()> {
    if registry.contains(identity) {
        return Err(AccessError::protected(identity.as_str()));
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Decision explanation
// ─────────────────────────────────────────────────────────────────────────────

/// Why a capability check passed or failed, for the admin panel's
/// "why can't I see this" view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessExplanation {
    pub required_capability: Capability,
    pub granted: bool,
    pub role: Option<Role>,
    pub source: RoleOrigin,
    pub capabilities: CapabilitySet,
    pub reason: String,
    pub suggestions: Vec<String>,
}

/// Explain a capability decision for a resolved identity.
pub fn explain(resolution: &Resolution, required: Capability) -> AccessExplanation {
    let capabilities = resolution.capabilities();
    let granted = capabilities.allows(required);

    let reason = match (resolution.role, granted) {
        (None, _) => format!(
            "No role applies to this identity, so '{}' is not granted",
            required
        ),
        (Some(role), true) => format!(
            "Role '{}' ({}) grants '{}'",
            role, resolution.source, required
        ),
        (Some(role), false) => format!(
            "Role '{}' ({}) does not grant '{}'",
            role, resolution.source, required
        ),
    };

    let mut suggestions = Vec::new();
    if !granted {
        let granting: Vec<&str> = Role::ALL
            .iter()
            .filter(|r| CapabilitySet::for_role(Some(**r)).allows(required))
            .map(|r| r.as_str())
            .collect();
        suggestions.push(format!(
            "Ask an access-policy manager to assign one of: {}",
            granting.join(", ")
        ));
        if resolution.source == RoleOrigin::Override {
            suggestions.push(
                "An override row is in effect; it supersedes any bootstrap assignment".to_string(),
            );
        }
    }

    AccessExplanation {
        required_capability: required,
        granted,
        role: resolution.role,
        source: resolution.source,
        capabilities,
        reason,
        suggestions,
    }
}
