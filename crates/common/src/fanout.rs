//! Structured fan-out/join for multi-provider lookups.
//!
//! Every multi-lookup call site uses the same settle-all-and-filter shape:
//! all futures run concurrently, each result is wrapped, and one failure
//! never fails the batch.

use anyhow::Result;
use futures_util::future::join_all;
use std::future::Future;

/// Run all futures concurrently and return every outcome once all have
/// settled. Order matches the input order.
pub async fn settle_all<T, Fut>(tasks: Vec<Fut>) -> Vec<Result<T>>
where
    Fut: Future<Output = Result<T>>,
{
    join_all(tasks).await
}

/// Settle all futures and keep only the successes, logging each failure at
/// warn level under `context`.
pub async fn settle_ok<T, Fut>(context: &str, tasks: Vec<Fut>) -> Vec<T>
where
    Fut: Future<Output = Result<T>>,
{
    settle_all(tasks)
        .await
        .into_iter()
        .filter_map(|outcome| match outcome {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(context, error = %e, "fan-out task failed; continuing without it");
                None
            }
        })
        .collect()
}
