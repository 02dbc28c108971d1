//! Shared plumbing for external provider calls: typed failure classes for
//! metrics labels, a bounded-timeout client builder, and a latency wrapper.

use std::time::Duration;
use thiserror::Error;

/// Why a provider call yielded no usable data. Every variant is recoverable:
/// callers fall back or degrade to `None`/empty, they never surface this to
/// the requester.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("api key not configured")]
    MissingKey,
    #[error("provider returned status {0}")]
    Status(u16),
    #[error("malformed provider payload: {0}")]
    Malformed(String),
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl ProviderError {
    /// Stable label for the `kind` dimension of error counters.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingKey => "missing_key",
            Self::Status(_) => "status",
            Self::Malformed(_) => "malformed",
            Self::Transport(e) if e.is_timeout() => "timeout",
            Self::Transport(_) => "transport",
        }
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Build a reqwest client with the bounded per-request timeout every
/// external call must carry. Timeout expiry is indistinguishable from a
/// failed response downstream.
pub fn client(timeout_secs: u64) -> ProviderResult<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()?)
}

/// Run one provider call, recording latency and a status-labeled request
/// counter. Every outbound endpoint goes through here.
pub async fn timed<T, Fut>(provider: &'static str, fut: Fut) -> ProviderResult<T>
where
    Fut: std::future::Future<Output = ProviderResult<T>>,
{
    let start = std::time::Instant::now();
    let res = fut.await;
    let ms = start.elapsed().as_secs_f64() * 1000.0;
    metrics::histogram!("conviction_api_latency_ms", "provider" => provider).record(ms);
    match &res {
        Ok(_) => {
            metrics::counter!("conviction_api_requests_total", "provider" => provider, "status" => "ok")
                .increment(1);
        }
        Err(e) => {
            metrics::counter!("conviction_api_requests_total", "provider" => provider, "status" => "error")
                .increment(1);
            metrics::counter!("conviction_api_errors_total", "provider" => provider, "kind" => e.kind())
                .increment(1);
        }
    }
    res
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds_are_stable() {
        assert_eq!(ProviderError::MissingKey.kind(), "missing_key");
        assert_eq!(ProviderError::Status(500).kind(), "status");
        assert_eq!(
            ProviderError::Malformed("bad".to_string()).kind(),
            "malformed"
        );
    }

    #[tokio::test]
    async fn test_timed_passes_through_result() {
        let ok: ProviderResult<u32> = timed("test", async { Ok(5u32) }).await;
        assert_eq!(ok.unwrap(), 5);

        let err: ProviderResult<u32> = timed("test", async { Err(ProviderError::Status(429)) }).await;
        assert!(matches!(err.unwrap_err(), ProviderError::Status(429)));
    }
}
