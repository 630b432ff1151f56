//! Storage-level errors and their mapping to the access-control taxonomy.
//!
//! ## Error Mapping
//!
//! | SQLx Error | StoreError | AccessError |
//! |------------|------------|-------------|
//! | PoolTimedOut / PoolClosed / Io / Tls | `Unavailable` | `StoreUnavailable` |
//! | Database (any code) | `Unavailable` | `StoreUnavailable` |
//! | ColumnDecode / Decode / ColumnNotFound | `Decode` | `StoreUnavailable` |
//! | call exceeded the store timeout | `Timeout` | `StoreUnavailable` |
//!
//! Every storage failure surfaces to callers as `StoreUnavailable`: reads fail
//! closed on it and audit writes swallow it.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

use muster_core::AccessError;

/// Default per-call store timeout.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_millis(3000);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store call timed out: {0}")]
    Timeout(String),

    #[error("failed to decode stored row: {0}")]
    Decode(String),
}

impl From<StoreError> for AccessError {
    fn from(value: StoreError) -> Self {
        AccessError::store_unavailable(value.to_string())
    }
}

/// Map SQLx errors to `StoreError`.
pub fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let code = db_err.code().map(|c| c.to_string()).unwrap_or_default();
            StoreError::Unavailable(format!(
                "database error in {} ({}): {}",
                operation,
                code,
                db_err.message()
            ))
        }
        sqlx::Error::PoolTimedOut => {
            StoreError::Unavailable(format!("connection pool timed out in {}", operation))
        }
        sqlx::Error::PoolClosed => {
            StoreError::Unavailable(format!("connection pool closed in {}", operation))
        }
        sqlx::Error::ColumnDecode { index, source } => {
            StoreError::Decode(format!("column {} in {}: {}", index, operation, source))
        }
        sqlx::Error::ColumnNotFound(column) => {
            StoreError::Decode(format!("column {} missing in {}", column, operation))
        }
        sqlx::Error::Decode(source) => {
            StoreError::Decode(format!("{} in {}", source, operation))
        }
        _ => StoreError::Unavailable(format!("sqlx error in {}: {}", operation, err)),
    }
}

/// Run a store call under a deadline.
///
/// Dropping the inner future on expiry cancels the call and releases its
/// connection back to the pool.
pub async fn bounded<T, F>(limit: Duration, operation: &str, fut: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout(format!(
            "{} exceeded {}ms",
            operation,
            limit.as_millis()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_store_error_is_store_unavailable() {
        for err in [
            StoreError::Unavailable("down".into()),
            StoreError::Timeout("slow".into()),
            StoreError::Decode("bad role".into()),
        ] {
            assert!(matches!(AccessError::from(err), AccessError::StoreUnavailable(_)));
        }
    }

    #[test]
    fn pool_errors_map_to_unavailable() {
        assert!(matches!(
            map_sqlx_error("get_override", sqlx::Error::PoolTimedOut),
            StoreError::Unavailable(msg) if msg.contains("get_override")
        ));
        assert!(matches!(
            map_sqlx_error("list_overrides", sqlx::Error::PoolClosed),
            StoreError::Unavailable(_)
        ));
        assert!(matches!(
            map_sqlx_error("get_override", sqlx::Error::ColumnNotFound("role".into())),
            StoreError::Decode(_)
        ));
    }

    #[tokio::test]
    async fn bounded_passes_through_fast_calls() {
        let out = bounded(Duration::from_millis(200), "fast", async { Ok::<_, StoreError>(7) }).await;
        assert_eq!(out, Ok(7));
    }

    #[tokio::test]
    async fn bounded_times_out_slow_calls() {
        let out = bounded(Duration::from_millis(10), "slow_call", async {
            tokio::time::sleep(Duration::from_millis(500)).await;
            Ok::<_, StoreError>(())
        })
        .await;
        assert!(matches!(out, Err(StoreError::Timeout(msg)) if msg.contains("slow_call")));
    }
}
