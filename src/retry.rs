//! Bounded retry with backoff for pipeline stages.
//!
//! Only errors that [`PdfDeckError::is_retryable`] accepts are retried;
//! client-input failures (file type, file size, validation, authentication)
//! and parse failures are returned on the first attempt.

use crate::error::PdfDeckError;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

/// How the delay grows between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backoff {
    /// Same delay every time.
    Fixed,
    /// `base * n` after the n-th failure.
    Linear,
    /// `base * 2^(n-1)` after the n-th failure.
    #[default]
    Exponential,
}

/// Attempt budget and delay schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. Must be ≥ 1.
    pub max_attempts: u32,
    /// Delay unit in milliseconds.
    pub base_delay_ms: u64,
    pub backoff: Backoff,
}

impl RetryPolicy {
    /// Run once, never retry.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay_ms: 0,
            backoff: Backoff::Fixed,
        }
    }

    /// `retries` extra attempts with exponential backoff from `base_delay_ms`.
    pub fn exponential(retries: u32, base_delay_ms: u64) -> Self {
        Self {
            max_attempts: retries + 1,
            base_delay_ms,
            backoff: Backoff::Exponential,
        }
    }

    /// Delay to wait after `failures` failed attempts (1-based).
    pub fn delay_after(&self, failures: u32) -> Duration {
        let n = failures.max(1);
        let ms = match self.backoff {
            Backoff::Fixed => self.base_delay_ms,
            Backoff::Linear => self.base_delay_ms.saturating_mul(n as u64),
            Backoff::Exponential => self
                .base_delay_ms
                .saturating_mul(2u64.saturating_pow(n - 1)),
        };
        Duration::from_millis(ms)
    }
}

impl Default for RetryPolicy {
    /// Three attempts, 1 s linear backoff.
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            backoff: Backoff::Linear,
        }
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// policy's attempt budget is spent. `op` receives the 1-based attempt number.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut op: F,
) -> Result<T, PdfDeckError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, PdfDeckError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_retryable() || attempt >= max_attempts => return Err(e),
            Err(e) => {
                let delay = policy.delay_after(attempt);
                warn!(
                    "{}: attempt {}/{} failed ({}), retrying in {}ms",
                    label,
                    attempt,
                    max_attempts,
                    e,
                    delay.as_millis()
                );
                sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn transient() -> PdfDeckError {
        PdfDeckError::FileFetch {
            url: "https://files.example/a.pdf".into(),
            reason: "HTTP 503".into(),
        }
    }

    fn retry_policy(max_attempts: u32, base_delay_ms: u64, backoff: Backoff) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay_ms,
            backoff,
        }
    }

    #[test]
    fn delay_schedules() {
        let fixed = retry_policy(3, 100, Backoff::Fixed);
        let linear = retry_policy(3, 100, Backoff::Linear);
        let expo = retry_policy(3, 100, Backoff::Exponential);
        assert_eq!(fixed.delay_after(3), Duration::from_millis(100));
        assert_eq!(linear.delay_after(3), Duration::from_millis(300));
        assert_eq!(expo.delay_after(1), Duration::from_millis(100));
        assert_eq!(expo.delay_after(3), Duration::from_millis(400));
    }

    #[tokio::test]
    async fn retries_transient_errors_until_success() {
        let calls = AtomicU32::new(0);
        let policy = retry_policy(3, 1, Backoff::Fixed);
        let out = with_retry(&policy, "fetch", |_| {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n < 3 {
                    Err(transient())
                } else {
                    Ok(n)
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(out, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn stops_at_attempt_budget() {
        let calls = AtomicU32::new(0);
        let policy = retry_policy(2, 1, Backoff::Linear);
        let res: Result<(), _> = with_retry(&policy, "fetch", |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(transient()) }
        })
        .await;
        assert!(res.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn client_errors_fail_fast() {
        let calls = AtomicU32::new(0);
        let policy = retry_policy(5, 1, Backoff::Fixed);
        let res: Result<(), _> = tokio_test::block_on(with_retry(&policy, "upload", |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(PdfDeckError::FileType {
                    file_name: "notes.docx".into(),
                })
            }
        }));
        assert!(matches!(res, Err(PdfDeckError::FileType { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
