//! Bounded deadlines for storage calls.

use std::future::Future;
use std::time::Duration;

use crate::db::RepositoryError;

/// Run a storage call, failing with `RepositoryError::Timeout` if it does not
/// finish within `limit`.
///
/// # Errors
///
/// Returns the call's own error, or `Timeout` naming `operation`.
pub async fn with_deadline<T, F>(
    limit: Duration,
    operation: &'static str,
    call: F,
) -> Result<T, RepositoryError>
where
    F: Future<Output = Result<T, RepositoryError>>,
{
    if let Ok(result) = tokio::time::timeout(limit, call).await {
        result
    } else {
        tracing::warn!(
            operation,
            timeout_ms = u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
            "storage call exceeded its deadline"
        );
        Err(RepositoryError::Timeout(operation))
    }
}
