//! Bounded retry loop with differentiated backoff.
//!
//! A unit of work is two phases, `search` then `download`. Failures are
//! classified by the source ([`SourceError`]) and the wait before the next
//! attempt depends on the class:
//!
//! | previous failure | wait before attempt k (k >= 1)         |
//! |------------------|----------------------------------------|
//! | `RateLimited`    | `rate_limit_unit * k` (or the hint)    |
//! | `Transient`      | `backoff_unit * 2^k`                   |
//! | `Fatal`          | no retry                               |
//!
//! Attempt 0 never waits.

use std::future::Future;
use std::time::Duration;

use crate::source::SourceError;

/// Caller-supplied progress sink.
pub type LogFn<'a> = &'a (dyn Fn(String) + Send + Sync);

/// Retry policy configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first (at least 1)
    pub max_attempts: u32,
    /// Unit for generic exponential backoff
    pub backoff_unit: Duration,
    /// Unit for linear rate-limit backoff
    pub rate_limit_unit: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_unit: Duration::from_secs(1),
            rate_limit_unit: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Default::default()
        }
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Generic wait before attempt `attempt` (0-indexed).
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.backoff_unit.saturating_mul(factor)
    }

    /// Rate-limit wait before attempt `attempt` (0-indexed).
    pub fn rate_limit_delay(&self, attempt: u32) -> Duration {
        self.rate_limit_unit.saturating_mul(attempt)
    }

    /// Wait before `attempt`, given the failure that ended the previous one.
    pub fn delay_before(&self, attempt: u32, previous: &SourceError) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        match previous {
            SourceError::RateLimited { retry_after, .. } => {
                let base = self.rate_limit_delay(attempt);
                retry_after.map_or(base, |hint| hint.max(base))
            }
            _ => self.backoff_delay(attempt),
        }
    }

    /// Whether another attempt may follow `attempts_made` failed ones.
    pub fn should_retry(&self, attempts_made: u32, error: &SourceError) -> bool {
        !error.is_fatal() && attempts_made < self.attempts()
    }
}

/// Final failure after the retry budget is spent (or a fatal failure).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("failed after {attempts} attempt(s): {last}")]
pub struct RetryError {
    pub attempts: u32,
    pub last: SourceError,
}

/// Runs `search` then `download` under a [`RetryPolicy`].
///
/// Knows nothing about job records: progress goes to the `log` callback and
/// the result goes back to the caller. Waits only suspend the calling task.
#[derive(Debug, Clone, Default)]
pub struct RetryController {
    policy: RetryPolicy,
}

impl RetryController {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub async fn run<I, O, S, SF, D, DF>(
        &self,
        mut search: S,
        mut download: D,
        log: LogFn<'_>,
    ) -> Result<O, RetryError>
    where
        S: FnMut() -> SF,
        SF: Future<Output = Result<I, SourceError>>,
        D: FnMut(I) -> DF,
        DF: Future<Output = Result<O, SourceError>>,
    {
        let max = self.policy.attempts();
        let mut attempt: u32 = 0;

        loop {
            log(format!("Attempt {}/{max}", attempt + 1));

            let outcome = match search().await {
                Ok(items) => download(items).await,
                Err(e) => Err(e),
            };

            let error = match outcome {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            let made = attempt + 1;
            log(format!("Attempt {made}/{max} failed: {error}"));

            if !self.policy.should_retry(made, &error) {
                if error.is_fatal() {
                    log("Error is not retryable; giving up".to_string());
                } else {
                    log(format!("Giving up after {made} attempt(s)"));
                }
                return Err(RetryError {
                    attempts: made,
                    last: error,
                });
            }

            let delay = self.policy.delay_before(made, &error);
            if error.is_rate_limited() {
                log(format!(
                    "Waiting {}s before retry (rate limited)",
                    delay.as_secs()
                ));
            } else {
                log(format!("Waiting {}s before retry", delay.as_secs()));
            }
            tokio::time::sleep(delay).await;

            attempt = made;
        }
    }
}
