//! Configuration loading and representation.
//!
//! Everything is read from the process environment at startup. The resulting
//! `AccessConfig` is immutable; in particular the bootstrap identity lists
//! can only change by restarting with a new environment.

use std::time::Duration;

use thiserror::Error;

use muster_auth::BootstrapRegistry;

use crate::error::DEFAULT_STORE_TIMEOUT;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            key,
            reason: reason.into(),
        }
    }
}

/// Where the application-submission history lives (display-name fallback).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionNamesConfig {
    pub table: String,
    pub identity_column: String,
    pub name_column: String,
    pub order_column: String,
}

impl Default for SubmissionNamesConfig {
    fn default() -> Self {
        Self {
            table: "applications".to_string(),
            identity_column: "discord_id".to_string(),
            name_column: "discord_username".to_string(),
            order_column: "created_at".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AccessConfig {
    /// Postgres connection string; `None` selects the in-memory stores.
    pub database_url: Option<String>,
    pub bootstrap: BootstrapRegistry,
    pub store_timeout: Duration,
    pub max_connections: u32,
    pub submissions: SubmissionNamesConfig,
    pub bind_addr: String,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            bootstrap: BootstrapRegistry::compiled(),
            store_timeout: DEFAULT_STORE_TIMEOUT,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            submissions: SubmissionNamesConfig::default(),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
        }
    }
}

impl AccessConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup (the environment, or a map in tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let bootstrap = match (get("MUSTER_SENIOR_ADMIN_IDS"), get("MUSTER_MANAGER_IDS")) {
            (None, None) => defaults.bootstrap,
            (senior, managers) => {
                let senior = split_list(senior.as_deref());
                let managers = split_list(managers.as_deref());
                BootstrapRegistry::from_lists(senior, managers).map_err(|e| {
                    ConfigError::invalid("MUSTER_SENIOR_ADMIN_IDS/MUSTER_MANAGER_IDS", e.to_string())
                })?
            }
        };

        let store_timeout = match get("MUSTER_STORE_TIMEOUT_MS") {
            Some(raw) => {
                let ms: u64 = raw
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::invalid("MUSTER_STORE_TIMEOUT_MS", format!("not a number: {raw:?}")))?;
                if ms == 0 {
                    return Err(ConfigError::invalid("MUSTER_STORE_TIMEOUT_MS", "must be positive"));
                }
                Duration::from_millis(ms)
            }
            None => defaults.store_timeout,
        };

        let max_connections = match get("MUSTER_DB_MAX_CONNECTIONS") {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| ConfigError::invalid("MUSTER_DB_MAX_CONNECTIONS", format!("expected a positive integer, got {raw:?}")))?,
            None => defaults.max_connections,
        };

        let mut submissions = SubmissionNamesConfig::default();
        for (key, slot) in [
            ("MUSTER_SUBMISSIONS_TABLE", &mut submissions.table),
            ("MUSTER_SUBMISSIONS_IDENTITY_COLUMN", &mut submissions.identity_column),
            ("MUSTER_SUBMISSIONS_NAME_COLUMN", &mut submissions.name_column),
            ("MUSTER_SUBMISSIONS_ORDER_COLUMN", &mut submissions.order_column),
        ] {
            if let Some(value) = get(key) {
                let value = value.trim().to_string();
                if !is_sql_identifier(&value) {
                    return Err(ConfigError::invalid(key, format!("not a plain SQL identifier: {value:?}")));
                }
                *slot = value;
            }
        }

        Ok(Self {
            database_url: get("DATABASE_URL"),
            bootstrap,
            store_timeout,
            max_connections,
            submissions,
            bind_addr: get("MUSTER_BIND_ADDR").unwrap_or(defaults.bind_addr),
        })
    }
}

fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// `name` or `schema.name`, ASCII letters/digits/underscore, not starting with a digit.
///
/// Submission table/column names are interpolated into SQL, so they are
/// restricted to this shape.
pub fn is_sql_identifier(value: &str) -> bool {
    let parts: Vec<&str> = value.split('.').collect();
    parts.len() <= 2
        && parts.iter().all(|part| {
            let mut chars = part.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}
