//! Store call timeout helpers
//!
//! Bounds every store round trip so a stuck connection surfaces as a
//! retryable error instead of hanging the request.

use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

use super::{StoreError, StoreResult};

/// Default timeout for store queries (5 seconds)
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Run a store operation with a timeout
///
/// Works for raw `sqlx` futures and for whole store calls alike.
pub async fn with_timeout<F, T, E>(duration: Duration, future: F) -> StoreResult<T>
where
    F: Future<Output = Result<T, E>>,
    E: Into<StoreError>,
{
    match timeout(duration, future).await {
        Ok(result) => result.map_err(Into::into),
        Err(_) => Err(StoreError::Timeout(duration)),
    }
}

/// Run a store operation with the default timeout (5 seconds)
pub async fn with_default_timeout<F, T, E>(future: F) -> StoreResult<T>
where
    F: Future<Output = Result<T, E>>,
    E: Into<StoreError>,
{
    with_timeout(DEFAULT_QUERY_TIMEOUT, future).await
}
