//! Retry logic with exponential backoff for transient LLM API failures.
//!
//! Only the HTTP transport retries. Callers above the client (the topic
//! extractor and the semantic matcher) see a single success or failure.
//!
//! # Example
//!
//! ```
//! use review_trends_core::llm::{FailureType, LlmError, RetryDecision, RetryPolicy, classify_error};
//!
//! let policy = RetryPolicy::default();
//! let error = LlmError::http_status("gemini", 503, "overloaded", None);
//!
//! match policy.should_retry(classify_error(&error), 1) {
//!     RetryDecision::Retry { delay, attempt } => {
//!         println!("Retrying in {:?} (attempt {})", delay, attempt);
//!     }
//!     RetryDecision::DoNotRetry { reason } => {
//!         println!("Not retrying: {}", reason);
//!     }
//! }
//! ```

use std::time::{Duration, SystemTime};

use rand::Rng;
use tracing::{debug, instrument};

use super::LlmError;

/// Default number of retries after the first attempt.
pub const DEFAULT_LLM_MAX_RETRIES: u32 = 2;

/// Default base delay for exponential backoff.
const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Default maximum delay cap.
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(16);

/// Maximum jitter added to delays.
const MAX_JITTER: Duration = Duration::from_millis(250);

/// Upper bound honoured for a server-provided `Retry-After`.
const MAX_RETRY_AFTER: Duration = Duration::from_secs(120);

/// Classification of LLM request failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// Timeouts, connection resets, 5xx.
    Transient,
    /// Bad request, auth failure, undecodable response.
    Permanent,
    /// HTTP 429.
    RateLimited,
}

/// Decision on whether to retry a failed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the specified delay.
    Retry {
        /// How long to wait before retrying.
        delay: Duration,
        /// Attempt number of the retry (1-indexed, so the first retry is attempt 2).
        attempt: u32,
    },
    /// Give up.
    DoNotRetry {
        /// Human-readable reason.
        reason: String,
    },
}

/// Exponential backoff configuration.
///
/// `delay = min(base_delay * 2^(attempt-1), max_delay) + jitter`
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_LLM_MAX_RETRIES + 1,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy allowing `max_retries` retries after the first attempt.
    #[must_use]
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self {
            max_attempts: max_retries.saturating_add(1),
            ..Self::default()
        }
    }

    /// Creates a policy with explicit delays (used by tests to keep them fast).
    #[must_use]
    pub fn new(max_retries: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_retries.saturating_add(1),
            base_delay,
            max_delay,
        }
    }

    /// Returns the maximum number of attempts, including the first.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Decides whether the attempt that just failed should be retried.
    #[instrument(skip(self), fields(max_attempts = self.max_attempts))]
    pub fn should_retry(&self, failure_type: FailureType, attempt: u32) -> RetryDecision {
        if failure_type == FailureType::Permanent {
            return RetryDecision::DoNotRetry {
                reason: "permanent failure - retry would not help".to_string(),
            };
        }

        if attempt >= self.max_attempts {
            debug!(attempt, max = self.max_attempts, "max attempts reached");
            return RetryDecision::DoNotRetry {
                reason: format!("max attempts ({}) exhausted", self.max_attempts),
            };
        }

        let delay = self.calculate_delay(attempt);
        debug!(
            attempt,
            next_attempt = attempt + 1,
            delay_ms = delay.as_millis(),
            "will retry"
        );
        RetryDecision::Retry {
            delay,
            attempt: attempt + 1,
        }
    }

    /// Like [`Self::should_retry`], but a server-provided `Retry-After` wins
    /// over the computed backoff when it is longer.
    #[must_use]
    pub fn should_retry_error(&self, error: &LlmError, attempt: u32) -> RetryDecision {
        match self.should_retry(classify_error(error), attempt) {
            RetryDecision::Retry { delay, attempt } => {
                let delay = match error {
                    LlmError::HttpStatus {
                        retry_after: Some(retry_after),
                        ..
                    } => delay.max((*retry_after).min(MAX_RETRY_AFTER)),
                    _ => delay,
                };
                RetryDecision::Retry { delay, attempt }
            }
            decision @ RetryDecision::DoNotRetry { .. } => decision,
        }
    }

    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    fn calculate_delay(&self, attempt: u32) -> Duration {
        let base_ms = self.base_delay.as_millis() as f64;
        let exponent = f64::from(attempt.saturating_sub(1));
        let delay_ms = (base_ms * 2f64.powf(exponent)).min(self.max_delay.as_millis() as f64);
        let jitter_ms = rand::thread_rng().gen_range(0..=MAX_JITTER.as_millis() as u64);
        Duration::from_millis(delay_ms as u64) + Duration::from_millis(jitter_ms)
    }
}

/// Classifies an LLM error into a failure type for retry decisions.
///
/// | Error | Type |
/// |-------|------|
/// | Timeout, transport failure | Transient |
/// | HTTP 408, 5xx | Transient |
/// | HTTP 429 | RateLimited |
/// | Other HTTP statuses | Permanent |
/// | Missing key, empty/undecodable body, client build | Permanent |
#[must_use]
pub fn classify_error(error: &LlmError) -> FailureType {
    match error {
        LlmError::Timeout { .. } | LlmError::Request { .. } => FailureType::Transient,
        LlmError::HttpStatus { status, .. } => match *status {
            429 => FailureType::RateLimited,
            408 => FailureType::Transient,
            s if s >= 500 => FailureType::Transient,
            _ => FailureType::Permanent,
        },
        LlmError::MissingApiKey { .. }
        | LlmError::EmptyResponse { .. }
        | LlmError::InvalidResponse { .. }
        | LlmError::ClientBuild { .. } => FailureType::Permanent,
    }
}

/// Parses a `Retry-After` header value (delta-seconds or HTTP-date).
#[must_use]
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    let value = value.trim();
    if let Ok(seconds) = value.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }
    let when = httpdate::parse_http_date(value).ok()?;
    Some(
        when.duration_since(SystemTime::now())
            .unwrap_or(Duration::ZERO),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy::new(max_retries, Duration::from_millis(10), Duration::from_millis(40))
    }

    #[test]
    fn test_permanent_failure_is_not_retried() {
        let policy = fast_policy(3);
        let decision = policy.should_retry(FailureType::Permanent, 1);
        assert!(matches!(decision, RetryDecision::DoNotRetry { .. }));
    }

    #[test]
    fn test_transient_failure_is_retried_until_exhausted() {
        let policy = fast_policy(2);
        assert!(matches!(
            policy.should_retry(FailureType::Transient, 1),
            RetryDecision::Retry { attempt: 2, .. }
        ));
        assert!(matches!(
            policy.should_retry(FailureType::Transient, 2),
            RetryDecision::Retry { attempt: 3, .. }
        ));
        assert!(matches!(
            policy.should_retry(FailureType::Transient, 3),
            RetryDecision::DoNotRetry { .. }
        ));
    }

    #[test]
    fn test_zero_retries_means_single_attempt() {
        let policy = RetryPolicy::with_max_retries(0);
        assert_eq!(policy.max_attempts(), 1);
        assert!(matches!(
            policy.should_retry(FailureType::RateLimited, 1),
            RetryDecision::DoNotRetry { .. }
        ));
    }

    #[test]
    fn test_delay_is_capped_with_jitter() {
        let policy = fast_policy(10);
        let RetryDecision::Retry { delay, .. } = policy.should_retry(FailureType::Transient, 8)
        else {
            panic!("expected retry");
        };
        assert!(delay >= Duration::from_millis(40));
        assert!(delay <= Duration::from_millis(40) + MAX_JITTER);
    }

    #[test]
    fn test_retry_after_extends_delay() {
        let policy = fast_policy(2);
        let error = LlmError::http_status("gemini", 429, "", Some(Duration::from_secs(3)));
        let RetryDecision::Retry { delay, .. } = policy.should_retry_error(&error, 1) else {
            panic!("expected retry");
        };
        assert!(delay >= Duration::from_secs(3));
    }

    #[test]
    fn test_classify_error_statuses() {
        let status = |s| LlmError::http_status("gemini", s, "", None);
        assert_eq!(classify_error(&status(429)), FailureType::RateLimited);
        assert_eq!(classify_error(&status(503)), FailureType::Transient);
        assert_eq!(classify_error(&status(408)), FailureType::Transient);
        assert_eq!(classify_error(&status(400)), FailureType::Permanent);
        assert_eq!(classify_error(&status(403)), FailureType::Permanent);
        assert_eq!(
            classify_error(&LlmError::missing_api_key("gemini")),
            FailureType::Permanent
        );
    }

    #[test]
    fn test_parse_retry_after_seconds() {
        assert_eq!(parse_retry_after("7"), Some(Duration::from_secs(7)));
        assert_eq!(parse_retry_after(" 0 "), Some(Duration::ZERO));
    }

    #[test]
    fn test_parse_retry_after_past_http_date_is_zero() {
        assert_eq!(
            parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT"),
            Some(Duration::ZERO)
        );
    }

    #[test]
    fn test_parse_retry_after_garbage_is_none() {
        assert_eq!(parse_retry_after("soon"), None);
    }
}
