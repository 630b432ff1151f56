//! Per-request correlation ids.

use tracing::Span;

/// Response header carrying the request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Time-ordered (UUIDv7) request id.
pub fn new_request_id() -> String {
    uuid::Uuid::now_v7().to_string()
}

/// Root span for one inbound request. `identity` and `role` are recorded
/// once the caller has been resolved.
pub fn request_span(method: &str, path: &str, request_id: &str) -> Span {
    tracing::info_span!(
        "request",
        %method,
        %path,
        %request_id,
        identity = tracing::field::Empty,
        role = tracing::field::Empty,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_ids_are_unique_v7() {
        let a = new_request_id();
        let b = new_request_id();
        assert_ne!(a, b);
        let parsed = uuid::Uuid::parse_str(&a).unwrap();
        assert_eq!(parsed.get_version_num(), 7);
    }
}
