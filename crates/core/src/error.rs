//! Access-control error model.

use thiserror::Error;

/// Result type used across the access-control layers.
pub type AccessResult<T> = Result<T, AccessError>;

/// Access-control error.
///
/// Validation failures (`InvalidIdentity`, `InvalidRole`, `ProtectedIdentity`)
/// are meant to be surfaced to the caller as client errors. `StoreUnavailable`
/// is an infrastructure failure: reads fail closed on it, audit writes swallow it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccessError {
    /// The identity string is not a well-formed snowflake.
    #[error("invalid identity: {0}")]
    InvalidIdentity(String),

    /// The role string is not one of the defined roles.
    #[error("invalid role: {0}")]
    InvalidRole(String),

    /// The identity belongs to the bootstrap registry and cannot be removed.
    #[error("identity {0} is protected by the bootstrap registry")]
    ProtectedIdentity(String),

    /// The operation targets an override row that does not exist.
    #[error("not found")]
    NotFound,

    /// The caller lacks the capability required for the operation.
    #[error("forbidden: missing capability '{0}'")]
    Forbidden(String),

    /// The backing store could not be reached or timed out.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
}

impl AccessError {
    pub fn invalid_identity(msg: impl Into<String>) -> Self {
        Self::InvalidIdentity(msg.into())
    }

    pub fn invalid_role(msg: impl Into<String>) -> Self {
        Self::InvalidRole(msg.into())
    }

    pub fn protected(identity: impl Into<String>) -> Self {
        Self::ProtectedIdentity(identity.into())
    }

    pub fn forbidden(capability: impl Into<String>) -> Self {
        Self::Forbidden(capability.into())
    }

    pub fn store_unavailable(msg: impl Into<String>) -> Self {
        Self::StoreUnavailable(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }

    /// True for errors caused by the request itself rather than the backend.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::StoreUnavailable(_))
    }
}
