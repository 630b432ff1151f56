use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Role;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown capability {0:?}")]
pub struct UnknownCapability(pub String);

/// A single gate checked by the web layer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Capability {
    CanOpenPanel,
    CanAccessElevatedArea,
    CanAccessSharedArea,
    CanManageSharedContent,
    CanViewAuditLog,
    CanManageAccessPolicy,
}

impl Capability {
    pub const ALL: [Capability; 6] = [
        Capability::CanOpenPanel,
        Capability::CanAccessElevatedArea,
        Capability::CanAccessSharedArea,
        Capability::CanManageSharedContent,
        Capability::CanViewAuditLog,
        Capability::CanManageAccessPolicy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::CanOpenPanel => "canOpenPanel",
            Capability::CanAccessElevatedArea => "canAccessElevatedArea",
            Capability::CanAccessSharedArea => "canAccessSharedArea",
            Capability::CanManageSharedContent => "canManageSharedContent",
            Capability::CanViewAuditLog => "canViewAuditLog",
            Capability::CanManageAccessPolicy => "canManageAccessPolicy",
        }
    }
}

impl core::fmt::Display for Capability {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Capability {
    type Err = UnknownCapability;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Capability::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownCapability(s.to_string()))
    }
}

/// Capabilities granted by a role.
///
/// Always derived from the role, never stored.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilitySet {
    pub can_open_panel: bool,
    pub can_access_elevated_area: bool,
    pub can_access_shared_area: bool,
    pub can_manage_shared_content: bool,
    pub can_view_audit_log: bool,
    pub can_manage_access_policy: bool,
}

impl CapabilitySet {
    /// No access at all (unknown or unauthenticated identities).
    pub fn none() -> Self {
        Self::default()
    }

    pub fn all() -> Self {
        Self {
            can_open_panel: true,
            can_access_elevated_area: true,
            can_access_shared_area: true,
            can_manage_shared_content: true,
            can_view_audit_log: true,
            can_manage_access_policy: true,
        }
    }

    /// Capability table.
    ///
    /// `Manager` and `SeniorAdmin` are currently equivalent; the senior tier only
    /// differs in directory ordering and bootstrap protection.
    pub fn for_role(role: Option<Role>) -> Self {
        match role {
            None => Self::none(),
            Some(Role::Staff) => Self {
                can_open_panel: true,
                can_access_shared_area: true,
                ..Self::none()
            },
            Some(Role::Manager) | Some(Role::SeniorAdmin) => Self::all(),
        }
    }

    pub fn allows(&self, capability: Capability) -> bool {
        match capability {
            Capability::CanOpenPanel => self.can_open_panel,
            Capability::CanAccessElevatedArea => self.can_access_elevated_area,
            Capability::CanAccessSharedArea => self.can_access_shared_area,
            Capability::CanManageSharedContent => self.can_manage_shared_content,
            Capability::CanViewAuditLog => self.can_view_audit_log,
            Capability::CanManageAccessPolicy => self.can_manage_access_policy,
        }
    }

    /// Granted capabilities, in declaration order.
    pub fn granted(&self) -> Vec<Capability> {
        Capability::ALL
            .into_iter()
            .filter(|c| self.allows(*c))
            .collect()
    }
}
