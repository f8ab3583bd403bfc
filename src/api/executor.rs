// src/api/executor.rs
//! Rate-limited request execution with bounded retry.
//!
//! Every outbound HTTP call is wrapped here. Two failure classes are
//! retried, everything else propagates immediately:
//!
//! - **Throttling (429)**: sleep for the server-suggested `Retry-After`
//!   duration (1 s when absent) and retry.
//! - **Transport failures** (connection reset, DNS, timeout): retry with
//!   exponential backoff, 2^attempt seconds.
//!
//! Both classes share the same attempt budget; exhausting it surfaces the
//! last error.

use super::client::ApiResponse;
use crate::constants::{BACKOFF_BASE_SECS, DEFAULT_RETRY_AFTER_SECS, MAX_REQUEST_ATTEMPTS};
use crate::error::{AppError, NotionErrorCode};
use reqwest::StatusCode;
use std::time::Duration;

/// Executes a request closure with rate-limit handling and bounded retry.
///
/// The closure is invoked once per attempt and must produce a fresh
/// future each time. Non-success statuses other than 429 are returned
/// as-is — classifying them is the parser's job.
pub async fn execute_with_retry<F, Fut>(mut request: F) -> Result<ApiResponse<String>, AppError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<ApiResponse<String>, AppError>>,
{
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        match request().await {
            Ok(response) if response.status == StatusCode::TOO_MANY_REQUESTS => {
                if attempt >= MAX_REQUEST_ATTEMPTS {
                    return Err(AppError::NotionService {
                        code: NotionErrorCode::RateLimited,
                        message: format!(
                            "still throttled after {} attempts against {}",
                            attempt, response.url
                        ),
                        status: response.status,
                    });
                }
                let wait = response.retry_after_secs.unwrap_or(DEFAULT_RETRY_AFTER_SECS);
                log::warn!(
                    "Rate limit reached on {}. Retrying after {} seconds... ({}/{})",
                    response.url,
                    wait,
                    attempt,
                    MAX_REQUEST_ATTEMPTS
                );
                tokio::time::sleep(Duration::from_secs(wait)).await;
            }
            Ok(response) => return Ok(response),
            Err(err) if err.is_transient() && attempt < MAX_REQUEST_ATTEMPTS => {
                let delay = Duration::from_secs(BACKOFF_BASE_SECS.pow(attempt));
                log::warn!(
                    "Transport failure: {}. Retrying in {:?}... ({}/{})",
                    err,
                    delay,
                    attempt,
                    MAX_REQUEST_ATTEMPTS
                );
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    fn throttled(url: &str, retry_after: Option<u64>) -> ApiResponse<String> {
        ApiResponse {
            data: String::new(),
            status: StatusCode::TOO_MANY_REQUESTS,
            url: url.to_string(),
            retry_after_secs: retry_after,
        }
    }

    fn success(body: &str) -> ApiResponse<String> {
        ApiResponse {
            data: body.to_string(),
            status: StatusCode::OK,
            url: "https://api.test/ok".to_string(),
            retry_after_secs: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn throttled_twice_then_success_sleeps_twice() {
        let calls = AtomicU32::new(0);
        let started = Instant::now();

        let response = execute_with_retry(|| {
            let attempt = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if attempt <= 2 {
                    Ok(throttled("https://api.test/query", Some(3)))
                } else {
                    Ok(success("done"))
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(response.data, "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // Two Retry-After sleeps of 3 s each under paused time.
        assert_eq!(started.elapsed().as_secs(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn throttling_exhausts_attempt_budget() {
        let calls = AtomicU32::new(0);

        let result = execute_with_retry(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(throttled("https://api.test/query", None)) }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), MAX_REQUEST_ATTEMPTS);
        match result {
            Err(AppError::NotionService { code, status, .. }) => {
                assert_eq!(code, NotionErrorCode::RateLimited);
                assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
            }
            other => panic!("expected rate-limit exhaustion, got {:?}", other.map(|r| r.status)),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn missing_retry_after_defaults_to_one_second() {
        let calls = AtomicU32::new(0);
        let started = Instant::now();

        execute_with_retry(|| {
            let attempt = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if attempt == 1 {
                    Ok(throttled("https://api.test/query", None))
                } else {
                    Ok(success("ok"))
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(started.elapsed().as_secs(), DEFAULT_RETRY_AFTER_SECS);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_back_off_exponentially() {
        let calls = AtomicU32::new(0);
        let started = Instant::now();

        let response = execute_with_retry(|| {
            let attempt = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if attempt <= 2 {
                    // A real transport error: nothing listens on this port.
                    let err = reqwest::get("http://127.0.0.1:1/down").await.unwrap_err();
                    Err(AppError::NetworkFailure(err))
                } else {
                    Ok(success("recovered"))
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(response.data, "recovered");
        // 2^1 + 2^2 seconds of backoff.
        assert_eq!(started.elapsed().as_secs(), 6);
    }

    #[tokio::test]
    async fn non_success_statuses_pass_through_untouched() {
        let calls = AtomicU32::new(0);

        let response = execute_with_retry(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Ok(ApiResponse {
                    data: r#"{"code":"validation_error"}"#.to_string(),
                    status: StatusCode::BAD_REQUEST,
                    url: "https://api.test/query".to_string(),
                    retry_after_secs: None,
                })
            }
        })
        .await
        .unwrap();

        // No retry: classification of non-429 statuses is the parser's job.
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
    }
}
