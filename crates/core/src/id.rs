//! Verified identity value.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::AccessError;

/// Shortest accepted snowflake (digits).
pub const MIN_IDENTITY_LEN: usize = 15;

/// Longest accepted snowflake (digits).
pub const MAX_IDENTITY_LEN: usize = 22;

/// An externally verified identity (a Discord snowflake).
///
/// The only way to obtain one is `Identity::parse` (or `FromStr` / serde),
/// so holders can rely on the value being non-empty, numeric and 15–22 digits
/// long. Raw session payloads are parsed once at the authentication boundary;
/// everything downstream works with this type.
///
/// Ordering is the plain string ordering, which is what directory listings
/// sort ties by.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identity(String);

impl Identity {
    /// Validate a raw identity string: ASCII digits only, nothing else.
    pub fn parse(raw: &str) -> Result<Self, AccessError> {
        if raw.is_empty() {
            return Err(AccessError::invalid_identity("identity is empty"));
        }
        if !raw.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AccessError::invalid_identity(format!(
                "identity must contain only digits: {raw:?}"
            )));
        }
        if !(MIN_IDENTITY_LEN..=MAX_IDENTITY_LEN).contains(&raw.len()) {
            return Err(AccessError::invalid_identity(format!(
                "identity must be {MIN_IDENTITY_LEN}-{MAX_IDENTITY_LEN} digits, got {}",
                raw.len()
            )));
        }
        Ok(Self(raw.to_string()))
    }

    /// Boundary helper for forwarded session headers: `None` for a missing or
    /// malformed identity. Header padding is trimmed before parsing.
    pub fn from_optional(raw: Option<&str>) -> Option<Self> {
        raw.and_then(|r| Self::parse(r.trim()).ok())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Identity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Identity {
    type Err = AccessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Identity {
    type Error = AccessError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Identity> for String {
    fn from(value: Identity) -> Self {
        value.0
    }
}

impl AsRef<str> for Identity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
