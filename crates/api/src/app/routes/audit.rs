use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use muster_infra::AuditQuery;

use crate::app::dto::EntriesResponse;
use crate::app::errors;
use crate::app::services::AppServices;
use crate::context::CallerContext;

pub fn router() -> Router {
    Router::new().route("/", get(query_audit))
}

/// GET /audit?area=&actorIdentity=&action=&target=&freeText=&limit=
pub async fn query_audit(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Query(query): Query<AuditQuery>,
) -> axum::response::Response {
    let Some(actor) = caller.actor() else {
        return errors::unauthenticated();
    };

    match services.access.query_audit(&actor, &query).await {
        Ok(entries) => (StatusCode::OK, Json(EntriesResponse::from(entries))).into_response(),
        Err(e) => errors::access_error_to_response(e, caller.is_anonymous()),
    }
}
