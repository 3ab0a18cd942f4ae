/*!
 * Retry policy for translation backend calls.
 *
 * Failures are classified as transient (rate limiting, overload, timeouts,
 * transport errors) or permanent. Transient failures are retried with
 * exponential backoff plus random jitter; permanent ones are returned on
 * first occurrence.
 */

use log::warn;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

use crate::errors::{ProviderError, TranslationError};

/// Status codes that indicate a transient backend condition
const RETRYABLE_STATUS_CODES: [u16; 5] = [429, 500, 502, 503, 504];

/// Lowercase message fragments that indicate a transient backend condition
const RETRYABLE_MESSAGE_HINTS: [&str; 14] = [
    "rate limit",
    "too many requests",
    "429",
    "quota",
    "resource exhausted",
    "resource_exhausted",
    "overloaded",
    "unavailable",
    "timeout",
    "timed out",
    "fetch failed",
    "network",
    "econnreset",
    "socket hang up",
];

/// How backend calls are retried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts for a retryable failure
    pub max_retries: u32,
    /// Delay before the first retry; doubled on every further retry
    pub base_delay: Duration,
    /// Upper bound of the random jitter added to every delay
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(2000),
            max_jitter: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay_ms: u64, max_jitter_ms: u64) -> Self {
        Self {
            max_retries,
            base_delay: Duration::from_millis(base_delay_ms),
            max_jitter: Duration::from_millis(max_jitter_ms),
        }
    }

    /// A policy that never retries
    pub fn no_retry() -> Self {
        Self::new(1, 0, 0)
    }

    /// Number of attempts actually made for a retryable failure
    pub fn attempts(&self) -> u32 {
        self.max_retries.max(1)
    }

    /// Backoff without jitter for the 0-indexed retry `attempt`
    pub fn base_backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }

    /// Backoff with jitter for the 0-indexed retry `attempt`
    pub fn backoff(&self, attempt: u32) -> Duration {
        let jitter_ms = self.max_jitter.as_millis() as u64;
        let jitter = if jitter_ms == 0 {
            0
        } else {
            rand::rng().random_range(0..=jitter_ms)
        };
        self.base_backoff(attempt) + Duration::from_millis(jitter)
    }

    /// Run `operation` until it succeeds, fails permanently, or the
    /// attempts run out
    pub async fn call<T, F, Fut>(&self, label: &str, mut operation: F) -> Result<T, TranslationError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let attempts = self.attempts();
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(error) if !is_retryable(&error) => {
                    return Err(TranslationError::Permanent(error));
                }
                Err(error) => {
                    attempt += 1;
                    if attempt >= attempts {
                        return Err(TranslationError::RetriesExhausted {
                            attempts: attempt,
                            source: error,
                        });
                    }

                    let delay = self.backoff(attempt - 1);
                    warn!(
                        "{} failed ({}), retrying in {} ms (attempt {}/{})",
                        label,
                        error,
                        delay.as_millis(),
                        attempt + 1,
                        attempts
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

/// Whether a backend error is worth retrying
pub fn is_retryable(error: &ProviderError) -> bool {
    match error {
        ProviderError::RateLimitExceeded(_)
        | ProviderError::ConnectionError(_)
        | ProviderError::Timeout(_) => true,
        ProviderError::AuthenticationError(_) | ProviderError::ParseError(_) => false,
        ProviderError::ApiError { status_code, message } => {
            RETRYABLE_STATUS_CODES.contains(status_code) || message_is_transient(message)
        }
        ProviderError::RequestFailed(message) => message_is_transient(message),
    }
}

fn message_is_transient(message: &str) -> bool {
    let lower = message.to_lowercase();
    RETRYABLE_MESSAGE_HINTS.iter().any(|hint| lower.contains(hint))
}
