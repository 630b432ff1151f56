use serde::{Deserialize, Serialize};

use muster_auth::{CapabilitySet, Role, RoleOrigin};
use muster_core::Identity;

// -------------------------
// Request DTOs
// -------------------------

/// Body of `PUT /access/roles/{identity}`.
///
/// `role` stays a string so that validation (and its error) is owned by the
/// access-control service.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertRoleRequest {
    pub role: String,
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ExplainQuery {
    pub capability: String,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub identity: Option<Identity>,
    pub role: Option<Role>,
    pub source: RoleOrigin,
    pub capabilities: CapabilitySet,
}

#[derive(Debug, Serialize)]
pub struct EntriesResponse<T> {
    pub entries: Vec<T>,
}

impl<T> From<Vec<T>> for EntriesResponse<T> {
    fn from(entries: Vec<T>) -> Self {
        Self { entries }
    }
}
