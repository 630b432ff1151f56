use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use muster_core::AccessError;

/// Map an access-control error to a JSON response.
///
/// A capability failure is 401 for anonymous callers and 403 otherwise.
pub fn access_error_to_response(err: AccessError, anonymous: bool) -> axum::response::Response {
    match err {
        AccessError::InvalidIdentity(msg) => {
            json_error(StatusCode::BAD_REQUEST, "invalid_identity", msg)
        }
        AccessError::InvalidRole(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_role", msg),
        err @ AccessError::ProtectedIdentity(_) => {
            json_error(StatusCode::CONFLICT, "protected_identity", err.to_string())
        }
        AccessError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        err @ AccessError::Forbidden(_) if anonymous => {
            json_error(StatusCode::UNAUTHORIZED, "unauthenticated", err.to_string())
        }
        err @ AccessError::Forbidden(_) => {
            json_error(StatusCode::FORBIDDEN, "forbidden", err.to_string())
        }
        AccessError::StoreUnavailable(msg) => {
            tracing::error!(error = %msg, "access store unavailable");
            json_error(
                StatusCode::SERVICE_UNAVAILABLE,
                "store_unavailable",
                "access store unavailable",
            )
        }
    }
}

pub fn unauthenticated() -> axum::response::Response {
    json_error(
        StatusCode::UNAUTHORIZED,
        "unauthenticated",
        "a verified identity is required",
    )
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
