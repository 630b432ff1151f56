//! Tracing/logging setup and request correlation shared by the binaries.

/// Initialize process-wide logging from the environment.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init();
}

/// Subscriber configuration (format, filters).
pub mod tracing;

/// Request ids and request spans.
pub mod correlation;

pub use self::correlation::{new_request_id, request_span, REQUEST_ID_HEADER};
pub use self::tracing::{LogFormat, LogSettings};
