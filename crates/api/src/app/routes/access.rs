//! Access-policy endpoints: the caller's own access, decision explanations,
//! the privileged directory, and role assignment.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};

use muster_auth::{explain, Capability};

use crate::app::dto::{EntriesResponse, ExplainQuery, MeResponse, UpsertRoleRequest};
use crate::app::errors;
use crate::app::services::AppServices;
use crate::context::CallerContext;

pub fn router() -> Router {
    Router::new()
        .route("/me", get(me))
        .route("/explain", get(explain_decision))
        .route("/directory", get(directory))
        .route("/roles/:identity", put(upsert_role).delete(remove_role))
}

/// GET /access/me - effective role and capabilities of the caller
pub async fn me(Extension(caller): Extension<CallerContext>) -> Json<MeResponse> {
    let resolution = caller.resolution();
    Json(MeResponse {
        identity: caller.identity().cloned(),
        role: resolution.role,
        source: resolution.source,
        capabilities: resolution.capabilities(),
    })
}

/// GET /access/explain?capability=canViewAuditLog
pub async fn explain_decision(
    Extension(caller): Extension<CallerContext>,
    Query(query): Query<ExplainQuery>,
) -> axum::response::Response {
    let capability: Capability = match query.capability.parse() {
        Ok(capability) => capability,
        Err(err) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "unknown_capability", err.to_string());
        }
    };

    (StatusCode::OK, Json(explain(caller.resolution(), capability))).into_response()
}

/// GET /access/directory - merged roster of privileged identities
pub async fn directory(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
) -> axum::response::Response {
    let Some(actor) = caller.actor() else {
        return errors::unauthenticated();
    };

    match services.access.list_directory(&actor).await {
        Ok(entries) => (StatusCode::OK, Json(EntriesResponse::from(entries))).into_response(),
        Err(e) => errors::access_error_to_response(e, caller.is_anonymous()),
    }
}

/// PUT /access/roles/:identity - create or update an override
pub async fn upsert_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Path(identity): Path<String>,
    Json(body): Json<UpsertRoleRequest>,
) -> axum::response::Response {
    let Some(actor) = caller.actor() else {
        return errors::unauthenticated();
    };

    match services
        .access
        .upsert_role(&actor, &identity, &body.role, body.display_name.as_deref())
        .await
    {
        Ok(entry) => (StatusCode::OK, Json(entry)).into_response(),
        Err(e) => errors::access_error_to_response(e, caller.is_anonymous()),
    }
}

/// DELETE /access/roles/:identity - remove an override
pub async fn remove_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Path(identity): Path<String>,
) -> axum::response::Response {
    let Some(actor) = caller.actor() else {
        return errors::unauthenticated();
    };

    match services.access.remove_role_strict(&actor, &identity).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::access_error_to_response(e, caller.is_anonymous()),
    }
}
