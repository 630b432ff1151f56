//! `muster-auth`: pure access-control policy (roles, capabilities, precedence).
//!
//! This crate is intentionally decoupled from HTTP and storage. Everything here
//! is a deterministic function of its inputs; the store-backed pieces live in
//! `muster-infra`.

pub mod authorize;
pub mod permissions;
pub mod registry;
pub mod roles;

pub use authorize::{
    authorize, capabilities_of, ensure_removable, explain,
    AccessExplanation, Resolution, RoleOrigin,
};
pub use permissions::{Capability, CapabilitySet, UnknownCapability};
pub use registry::BootstrapRegistry;
pub use roles::Role;
