use axum::Router;

pub mod access;
pub mod audit;
pub mod system;

/// Router for every endpoint that sees a `CallerContext`.
pub fn router() -> Router {
    Router::new()
        .nest("/access", access::router())
        .nest("/audit", audit::router())
}
