//! HTTP API: the request layer in front of the access-control engine.

pub mod app;
pub mod context;
pub mod middleware;
