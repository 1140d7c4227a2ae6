//! Bounded retry with per-call timeout and exponential backoff.
//!
//! Each attempt calls the model under its own timeout and validates the
//! raw text. Malformed output and transient delivery failures are retried;
//! anything else stops immediately. No lock is held across the call.

use std::time::Duration;

use thiserror::Error;
use tokio::time::{sleep, timeout};

use skillgraph_core::config::LlmSettings;
use skillgraph_core::SchemaError;

use crate::error::LlmError;
use crate::{CompletionRequest, LanguageModel};

/// Retry and timeout budget for one logical model call.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubled for each later retry.
    pub base_delay: Duration,
    /// Timeout applied to each individual attempt.
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(500),
            timeout: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    pub fn from_settings(settings: &LlmSettings) -> Self {
        Self {
            max_retries: settings.max_retries,
            base_delay: Duration::from_millis(settings.retry_base_delay_ms),
            timeout: Duration::from_secs(settings.timeout_secs),
        }
    }

    /// A policy without backoff delay.
    pub fn immediate(max_retries: u32, timeout: Duration) -> Self {
        Self {
            max_retries,
            base_delay: Duration::ZERO,
            timeout,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    /// Backoff before retry number `retry` (1-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.base_delay.saturating_mul(factor)
    }
}

/// Why a single attempt failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AttemptFailure {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Malformed(#[from] SchemaError),
}

impl AttemptFailure {
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Llm(e) => e.is_transient(),
            Self::Malformed(_) => true,
        }
    }

    /// Truncated raw model output, when the failure was a validation failure.
    pub fn raw_excerpt(&self) -> Option<&str> {
        match self {
            Self::Malformed(SchemaError::MalformedResponse { excerpt, .. }) => Some(excerpt),
            _ => None,
        }
    }
}

/// All attempts failed; carries the last failure.
#[derive(Error, Debug, Clone)]
#[error("gave up after {attempts} attempt(s): {last}")]
pub struct RetryExhausted {
    pub attempts: u32,
    pub last: AttemptFailure,
}

/// Call `model` until `validate` accepts its output or the policy is exhausted.
pub async fn complete_validated<T, F>(
    model: &dyn LanguageModel,
    request: &CompletionRequest,
    policy: &RetryPolicy,
    mut validate: F,
) -> Result<T, RetryExhausted>
where
    F: FnMut(&str) -> Result<T, SchemaError>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;

        let failure = match timeout(policy.timeout, model.complete(request)).await {
            Err(_) => AttemptFailure::Llm(LlmError::Timeout {
                secs: policy.timeout.as_secs(),
            }),
            Ok(Err(e)) => AttemptFailure::Llm(e),
            Ok(Ok(raw)) => match validate(&raw) {
                Ok(value) => return Ok(value),
                Err(e) => AttemptFailure::Malformed(e),
            },
        };

        if !failure.is_retryable() || attempt >= policy.max_attempts() {
            return Err(RetryExhausted {
                attempts: attempt,
                last: failure,
            });
        }

        let delay = policy.backoff(attempt);
        tracing::warn!(
            attempt,
            max_attempts = policy.max_attempts(),
            delay_ms = delay.as_millis() as u64,
            error = %failure,
            "Language model attempt failed, retrying"
        );
        sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scripted::ScriptedModel;

    fn request() -> CompletionRequest {
        CompletionRequest::new("prompt", 100)
    }

    fn parse_number(raw: &str) -> Result<u32, SchemaError> {
        raw.trim()
            .parse()
            .map_err(|_| SchemaError::malformed("not a number", raw))
    }

    #[test]
    fn backoff_doubles() {
        let policy = RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(100),
            timeout: Duration::from_secs(1),
        };
        assert_eq!(policy.backoff(1), Duration::from_millis(100));
        assert_eq!(policy.backoff(2), Duration::from_millis(200));
        assert_eq!(policy.backoff(3), Duration::from_millis(400));
        assert_eq!(policy.max_attempts(), 4);
    }

    #[tokio::test]
    async fn first_valid_response_is_not_retried() {
        let model = ScriptedModel::new(vec![Ok("7".to_string()), Ok("8".to_string())]);
        let policy = RetryPolicy::immediate(2, Duration::from_secs(1));
        let value = complete_validated(&model, &request(), &policy, parse_number)
            .await
            .unwrap();
        assert_eq!(value, 7);
        assert_eq!(model.calls(), 1);
    }

    #[tokio::test]
    async fn malformed_then_transient_then_valid() {
        let model = ScriptedModel::new(vec![
            Ok("seven".to_string()),
            Err(LlmError::RateLimited),
            Ok("7".to_string()),
        ]);
        let policy = RetryPolicy::immediate(2, Duration::from_secs(1));
        let value = complete_validated(&model, &request(), &policy, parse_number)
            .await
            .unwrap();
        assert_eq!(value, 7);
        assert_eq!(model.calls(), 3);
    }

    #[tokio::test]
    async fn exhaustion_reports_last_failure() {
        let model = ScriptedModel::new(vec![
            Ok("a".to_string()),
            Ok("b".to_string()),
            Ok("c".to_string()),
            Ok("9".to_string()),
        ]);
        let policy = RetryPolicy::immediate(2, Duration::from_secs(1));
        let err = complete_validated(&model, &request(), &policy, parse_number)
            .await
            .unwrap_err();
        assert_eq!(err.attempts, 3);
        assert_eq!(err.last.raw_excerpt(), Some("c"));
        assert_eq!(model.calls(), 3);
    }

    #[tokio::test]
    async fn permanent_errors_stop_immediately() {
        let model = ScriptedModel::new(vec![
            Err(LlmError::Api {
                status: 401,
                body: "bad key".to_string(),
            }),
            Ok("1".to_string()),
        ]);
        let policy = RetryPolicy::immediate(2, Duration::from_secs(1));
        let err = complete_validated(&model, &request(), &policy, parse_number)
            .await
            .unwrap_err();
        assert_eq!(err.attempts, 1);
        assert!(!err.last.is_retryable());
    }

    #[tokio::test]
    async fn slow_calls_time_out_and_retry() {
        let model = ScriptedModel::new(vec![Ok("1".to_string()), Ok("2".to_string())])
            .with_latency(vec![Duration::from_secs(5), Duration::ZERO]);
        let policy = RetryPolicy::immediate(1, Duration::from_millis(20));
        let value = complete_validated(&model, &request(), &policy, parse_number)
            .await
            .unwrap();
        assert_eq!(value, 2);
    }
}
