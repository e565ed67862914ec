//! Bounded retry with exponential backoff for external calls.

use std::future::Future;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use adpilot_core::{ApiError, ExecutionConfig};
use tracing::debug;

/// Run `call` up to `cfg.max_attempts` times, backing off exponentially
/// between attempts. Only transient errors (transport, rate limit, 5xx)
/// are retried; permanent errors return immediately.
pub(crate) async fn with_retries<T, F, Fut>(
    cfg: &ExecutionConfig,
    what: &str,
    mut call: F,
) -> Result<T, ApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let mut delay_ms = cfg.initial_backoff_ms;
    let mut attempt: u32 = 1;

    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < cfg.max_attempts => {
                // Jitter without a rand dependency: nanosecond fraction of now.
                let jitter_ms = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .unwrap_or_default()
                    .subsec_nanos() as u64
                    % 100;

                debug!(
                    what = %what,
                    attempt,
                    delay_ms = delay_ms + jitter_ms,
                    error = %e,
                    "transient error, retrying"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms + jitter_ms)).await;

                delay_ms = (delay_ms.saturating_mul(2)).min(cfg.max_backoff_ms);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn fast_cfg() -> ExecutionConfig {
        ExecutionConfig {
            worker_count: 1,
            max_attempts: 3,
            initial_backoff_ms: 1,
            max_backoff_ms: 4,
        }
    }

    #[tokio::test]
    async fn transient_errors_retry_then_succeed() {
        let calls = AtomicU32::new(0);
        let result = with_retries(&fast_cfg(), "fetch", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(ApiError::Transport("flaky".into()))
                } else {
                    Ok(42)
                }
            }
        })
        .await;
        assert_eq!(result, Ok(42));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn transient_errors_exhaust_the_budget() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_retries(&fast_cfg(), "fetch", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ApiError::RateLimited { retry_after_secs: 1 }) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_errors_never_retry() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_retries(&fast_cfg(), "apply", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(ApiError::Rejected {
                    message: "entity archived".into(),
                })
            }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1, "no retry on permanent error");
    }
}
