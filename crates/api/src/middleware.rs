use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::Instrument;

use muster_auth::Resolution;
use muster_core::Identity;
use muster_observability::{new_request_id, request_span, REQUEST_ID_HEADER};

use crate::app::services::AppServices;
use crate::context::CallerContext;

/// Verified identity forwarded by the upstream OAuth proxy.
pub const IDENTITY_HEADER: &str = "x-verified-identity";
/// Optional display name forwarded alongside the identity.
pub const DISPLAY_NAME_HEADER: &str = "x-verified-display-name";

/// Parse the identity header once, resolve it, and attach a `CallerContext`.
///
/// Never rejects: gating happens per route on the resolved capabilities.
pub async fn identity_middleware(
    State(services): State<Arc<AppServices>>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let request_id = new_request_id();
    let span = request_span(req.method().as_str(), req.uri().path(), &request_id);

    let identity = Identity::from_optional(header_str(req.headers(), IDENTITY_HEADER));
    let display_name = header_str(req.headers(), DISPLAY_NAME_HEADER)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string);

    let resolution = match &identity {
        Some(identity) => {
            span.record("identity", identity.as_str());
            services.access.resolve(identity).instrument(span.clone()).await
        }
        None => Resolution::NONE,
    };
    span.record("role", resolution.role.map(|r| r.as_str()).unwrap_or("none"));

    req.extensions_mut()
        .insert(CallerContext::new(identity, display_name, resolution));

    let mut response = next.run(req).instrument(span).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}
