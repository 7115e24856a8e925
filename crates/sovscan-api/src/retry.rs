// Retry with exponential backoff for catalog reads
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay_ms: 500,
            max_delay_ms: 10_000,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// No retries at all. Used by callers that would rather fail fast and
    /// fall back to the local cache than stall a scan.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }
}

/// Sorts errors into "worth another attempt" and "stop immediately".
///
/// Transient trouble (network blips, 5xx, rate limits) is retryable;
/// a 401 or a malformed request will fail identically on every
/// attempt, so retrying it just burns time and catalog quota.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

/// Run `operation`, retrying transient failures with exponential backoff.
///
/// The catalog is a shared hosted backend; hammering it on a blip helps
/// nobody. Each failed attempt waits progressively longer, capped at
/// `max_delay_ms`. Non-retryable errors are returned on the spot,
/// untouched.
pub async fn with_retry<F, Fut, T, E>(config: &RetryConfig, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display + Retryable,
{
    let mut attempt = 0;
    let mut delay_ms = config.initial_delay_ms;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    debug!("Catalog request succeeded after {} retries", attempt);
                }
                return Ok(result);
            }
            Err(err) => {
                if !err.is_retryable() {
                    debug!("Catalog request failed, not retryable: {}", err);
                    return Err(err);
                }

                attempt += 1;

                if attempt > config.max_retries {
                    warn!(
                        "Catalog request failed after {} attempts: {}",
                        attempt, err
                    );
                    return Err(err);
                }

                warn!(
                    "Catalog request failed (attempt {}/{}): {}. Retrying in {}ms",
                    attempt, config.max_retries, err, delay_ms
                );

                sleep(Duration::from_millis(delay_ms)).await;

                delay_ms = ((delay_ms as f64) * config.backoff_multiplier) as u64;
                delay_ms = delay_ms.min(config.max_delay_ms);
            }
        }
    }
}

/// Status codes worth retrying: server errors, rate limits, timeouts.
/// 4xx client errors (short of 429) mean the request itself is wrong.
pub fn is_retryable_status(status: reqwest::StatusCode) -> bool {
    status.is_server_error()
        || status == reqwest::StatusCode::TOO_MANY_REQUESTS
        || status == reqwest::StatusCode::REQUEST_TIMEOUT
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug, PartialEq)]
    enum TestError {
        Transient,
        Fatal,
    }

    impl std::fmt::Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                TestError::Transient => write!(f, "503 from the catalog"),
                TestError::Fatal => write!(f, "401 from the catalog"),
            }
        }
    }

    impl Retryable for TestError {
        fn is_retryable(&self) -> bool {
            matches!(self, TestError::Transient)
        }
    }

    fn fast_config(max_retries: u32) -> RetryConfig {
        RetryConfig {
            max_retries,
            initial_delay_ms: 5,
            max_delay_ms: 20,
            backoff_multiplier: 2.0,
        }
    }

    #[tokio::test]
    async fn first_try_success_makes_one_call() {
        let calls = AtomicU32::new(0);

        let result = with_retry(&fast_config(3), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, TestError>("rows")
        })
        .await;

        assert_eq!(result, Ok("rows"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn recovers_from_transient_failures() {
        let calls = AtomicU32::new(0);

        let result = with_retry(&fast_config(3), || async {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n < 3 {
                Err(TestError::Transient)
            } else {
                Ok(n)
            }
        })
        .await;

        assert_eq!(result, Ok(3));
    }

    #[tokio::test]
    async fn gives_up_after_budget_exhausted() {
        let calls = AtomicU32::new(0);

        let result = with_retry(&fast_config(2), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<u32, _>(TestError::Transient)
        })
        .await;

        assert_eq!(result, Err(TestError::Transient));
        // initial attempt + 2 retries
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_retryable_errors_fail_fast() {
        let calls = AtomicU32::new(0);

        // Plenty of retry budget, none of it spent: a fatal error makes
        // exactly one call
        let result = with_retry(&fast_config(3), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<u32, _>(TestError::Fatal)
        })
        .await;

        assert_eq!(result, Err(TestError::Fatal));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn none_config_fails_on_first_error() {
        let calls = AtomicU32::new(0);

        let result = with_retry(&RetryConfig::none(), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<u32, _>(TestError::Transient)
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn retryable_statuses() {
        assert!(is_retryable_status(
            reqwest::StatusCode::INTERNAL_SERVER_ERROR
        ));
        assert!(is_retryable_status(reqwest::StatusCode::SERVICE_UNAVAILABLE));
        assert!(is_retryable_status(reqwest::StatusCode::TOO_MANY_REQUESTS));

        assert!(!is_retryable_status(reqwest::StatusCode::NOT_FOUND));
        assert!(!is_retryable_status(reqwest::StatusCode::UNAUTHORIZED));
    }
}
