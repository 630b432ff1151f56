//! `muster-core`: access-control foundation primitives.
//!
//! This crate contains **pure** value types shared by every layer (no IO).

pub mod error;
pub mod id;

pub use error::{AccessError, AccessResult};
pub use id::{Identity, MAX_IDENTITY_LEN, MIN_IDENTITY_LEN};
