//! Deploy-time bootstrap identities.
//!
//! The registry is built once at process start and never mutated afterwards.
//! Changing who holds a bootstrap tier means shipping a new binary or a new
//! configuration; there is deliberately no runtime API for it.

use std::collections::BTreeSet;

use muster_core::{AccessResult, Identity};

use crate::Role;

/// Compiled-in senior admins.
pub const SENIOR_ADMIN_IDS: &[&str] = &["100000000000000000"];

/// Compiled-in managers. Senior admins may also appear here; the senior tier wins.
pub const MANAGER_IDS: &[&str] = &["100000000000000000", "100000000000000001"];

/// Fixed identity → role assignments for the two elevated tiers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootstrapRegistry {
    senior_admins: BTreeSet<Identity>,
    managers: BTreeSet<Identity>,
}

impl BootstrapRegistry {
    /// Registry from the compiled-in lists.
    pub fn compiled() -> Self {
        let parse_all = |ids: &[&str]| -> BTreeSet<Identity> {
            ids.iter().filter_map(|raw| Identity::parse(raw).ok()).collect()
        };
        Self {
            senior_admins: parse_all(SENIOR_ADMIN_IDS),
            managers: parse_all(MANAGER_IDS),
        }
    }

    /// Registry from configured lists.
    ///
    /// Any malformed entry fails the whole construction, so a typo in the
    /// deployment config cannot silently drop a bootstrap identity.
    pub fn from_lists<I, J, S, T>(senior_admins: I, managers: J) -> AccessResult<Self>
    where
        I: IntoIterator<Item = S>,
        J: IntoIterator<Item = T>,
        S: AsRef<str>,
        T: AsRef<str>,
    {
        let senior_admins = senior_admins
            .into_iter()
            .map(|raw| Identity::parse(raw.as_ref()))
            .collect::<AccessResult<BTreeSet<_>>>()?;
        let managers = managers
            .into_iter()
            .map(|raw| Identity::parse(raw.as_ref()))
            .collect::<AccessResult<BTreeSet<_>>>()?;
        Ok(Self {
            senior_admins,
            managers,
        })
    }

    /// Empty registry (tests, or deployments that rely on overrides only).
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn role_of(&self, identity: &Identity) -> Option<Role> {
        if self.senior_admins.contains(identity) {
            Some(Role::SeniorAdmin)
        } else if self.managers.contains(identity) {
            Some(Role::Manager)
        } else {
            None
        }
    }

    pub fn contains(&self, identity: &Identity) -> bool {
        self.role_of(identity).is_some()
    }

    /// Every bootstrap identity with its effective role, highest tier first and
    /// then by identity.
    pub fn entries(&self) -> Vec<(Identity, Role)> {
        let mut out: Vec<(Identity, Role)> = self
            .senior_admins
            .iter()
            .map(|id| (id.clone(), Role::SeniorAdmin))
            .collect();
        out.extend(
            self.managers
                .iter()
                .filter(|id| !self.senior_admins.contains(*id))
                .map(|id| (id.clone(), Role::Manager)),
        );
        out
    }

    pub fn len(&self) -> usize {
        self.senior_admins.union(&self.managers).count()
    }

    pub fn is_empty(&self) -> bool {
        self.senior_admins.is_empty() && self.managers.is_empty()
    }
}
