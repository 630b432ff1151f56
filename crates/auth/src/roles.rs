use core::str::FromStr;

use serde::{Deserialize, Serialize};

use muster_core::AccessError;

/// Privilege tier.
///
/// Variants are declared lowest first so the derived `Ord` is the privilege
/// order: `SeniorAdmin > Manager > Staff`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Staff,
    Manager,
    SeniorAdmin,
}

impl Role {
    /// Every role, highest privilege first.
    pub const ALL: [Role; 3] = [Role::SeniorAdmin, Role::Manager, Role::Staff];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Staff => "staff",
            Role::Manager => "manager",
            Role::SeniorAdmin => "senior_admin",
        }
    }

    /// Numeric privilege rank (higher is more privileged).
    pub fn rank(&self) -> u8 {
        match self {
            Role::Staff => 1,
            Role::Manager => 2,
            Role::SeniorAdmin => 3,
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AccessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "staff" => Ok(Role::Staff),
            "manager" => Ok(Role::Manager),
            "senior_admin" => Ok(Role::SeniorAdmin),
            other => Err(AccessError::invalid_role(format!(
                "{other:?} (expected one of: senior_admin, manager, staff)"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_follows_privilege() {
        assert!(Role::SeniorAdmin > Role::Manager);
        assert!(Role::Manager > Role::Staff);

        let mut roles = vec![Role::Staff, Role::SeniorAdmin, Role::Manager];
        roles.sort_by(|a, b| b.cmp(a));
        assert_eq!(roles, Role::ALL.to_vec());
    }

    #[test]
    fn wire_names_round_trip() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
            let json = serde_json::to_string(&role).unwrap();
            assert_eq!(json, format!("\"{}\"", role.as_str()));
        }
    }

    #[test]
    fn unknown_roles_are_rejected() {
        for raw in ["", "admin", "owner", "Senior_Admin", "senior-admin"] {
            assert!(matches!(raw.parse::<Role>(), Err(AccessError::InvalidRole(_))));
        }
    }
}
