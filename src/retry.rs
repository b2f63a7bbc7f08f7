//! Retry with capped exponential backoff for flaky external calls.
//!
//! A [`RetryPolicy`] is a plain value attached at each call site. The wrapped
//! operation is called afresh on every attempt, so it must tolerate being
//! repeated. Only errors that report themselves as retryable are repeated;
//! everything else is returned on the first failure.
use crate::error::{Error, Result, Retryable};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl RetryPolicy {
    /// Build a policy, rejecting zero attempts or zero delays.
    #[cfg(test)]
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Result<Self> {
        if max_attempts == 0 {
            return Err(Error::InvalidConfig(
                "retry max_attempts must be at least 1".to_string(),
            ));
        }
        if base_delay.is_zero() || max_delay.is_zero() {
            return Err(Error::InvalidConfig(format!(
                "retry delays must be positive (base {base_delay:?}, max {max_delay:?})"
            )));
        }
        Ok(Self {
            max_attempts,
            base_delay,
            max_delay,
        })
    }

    const fn preset(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
        }
    }

    /// Default for HTTP reads and property updates.
    pub const fn standard() -> Self {
        Self::preset(3)
    }

    /// Completions are slow and rate limited more often.
    pub const fn language_model() -> Self {
        Self::preset(4)
    }

    pub const fn comment() -> Self {
        Self::preset(2)
    }

    /// One attempt, no backoff.
    pub const fn single() -> Self {
        Self::preset(1)
    }

    #[cfg(test)]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before the `retry`-th retry (1-based): `min(base * 2^(retry-1), max)`.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1);
        2u32.checked_pow(exponent)
            .and_then(|factor| self.base_delay.checked_mul(factor))
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }

    /// Run `op` under this policy, blocking the thread between attempts.
    pub fn run<T, E, F>(&self, label: &str, op: F) -> std::result::Result<T, E>
    where
        E: Retryable + std::fmt::Display,
        F: FnMut() -> std::result::Result<T, E>,
    {
        self.run_with(label, std::thread::sleep, op)
    }

    /// Like [`RetryPolicy::run`] with an injected sleep function.
    pub fn run_with<T, E, F, S>(
        &self,
        label: &str,
        mut sleep: S,
        mut op: F,
    ) -> std::result::Result<T, E>
    where
        E: Retryable + std::fmt::Display,
        F: FnMut() -> std::result::Result<T, E>,
        S: FnMut(Duration),
    {
        let mut attempt = 1;
        loop {
            let err = match op() {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::info!(operation = label, attempt, "retry succeeded");
                    }
                    return Ok(value);
                }
                Err(err) => err,
            };
            if !err.is_retryable() {
                tracing::debug!(
                    operation = label,
                    attempt,
                    error = %err,
                    "permanent failure, not retrying"
                );
                return Err(err);
            }
            if attempt >= self.max_attempts {
                tracing::warn!(
                    operation = label,
                    attempts = attempt,
                    error = %err,
                    "giving up after final attempt"
                );
                return Err(err);
            }
            let delay = self.delay_for(attempt);
            tracing::warn!(
                operation = label,
                attempt,
                max_attempts = self.max_attempts,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %err,
                "transient failure, retrying"
            );
            sleep(delay);
            attempt += 1;
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
