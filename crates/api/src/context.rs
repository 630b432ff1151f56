use muster_auth::Resolution;
use muster_core::Identity;
use muster_infra::Actor;

/// Caller context for a request.
///
/// Built once by `identity_middleware` from the verified identity header and
/// immutable afterwards. An absent or malformed header yields an anonymous
/// caller with `Resolution::NONE`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerContext {
    identity: Option<Identity>,
    display_name: Option<String>,
    resolution: Resolution,
}

impl CallerContext {
    pub fn new(
        identity: Option<Identity>,
        display_name: Option<String>,
        resolution: Resolution,
    ) -> Self {
        Self {
            identity,
            display_name,
            resolution,
        }
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn resolution(&self) -> &Resolution {
        &self.resolution
    }

    pub fn is_anonymous(&self) -> bool {
        self.identity.is_none()
    }

    /// The caller as the actor of a privileged call; `None` when anonymous.
    pub fn actor(&self) -> Option<Actor> {
        self.identity.as_ref().map(|identity| Actor {
            identity: identity.clone(),
            display_name: self.display_name.clone(),
            resolution: self.resolution,
        })
    }
}
