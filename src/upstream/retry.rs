//! Bounded retry with exponential backoff.

use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::error::FetchError;
use crate::config::UpstreamConfig;

/// How often and how patiently a request is repeated.
///
/// A request is attempted at most `max_retries + 1` times. Before retry `n`
/// (1-based) the policy sleeps `base_delay * 2^(n-1)`, clamped to `max_delay`
/// when one is set. There is no jitter.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
  max_retries: u32,
  base_delay: Duration,
  max_delay: Option<Duration>,
  /// Give up on the first non-retryable failure instead of spending the budget
  fail_fast_on_terminal: bool,
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self {
      max_retries: 3,
      base_delay: Duration::from_secs(1),
      max_delay: None,
      fail_fast_on_terminal: false,
    }
  }
}

impl RetryPolicy {
  pub fn new(max_retries: u32) -> Self {
    Self {
      max_retries,
      ..Self::default()
    }
  }

  pub fn from_config(config: &UpstreamConfig) -> Self {
    Self {
      max_retries: config.max_retries,
      base_delay: config.backoff_base(),
      max_delay: config.max_backoff(),
      fail_fast_on_terminal: config.fail_fast_on_terminal,
    }
  }

  pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
    self.base_delay = base_delay;
    self
  }

  pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
    self.max_delay = Some(max_delay);
    self
  }

  pub fn with_fail_fast_on_terminal(mut self, fail_fast: bool) -> Self {
    self.fail_fast_on_terminal = fail_fast;
    self
  }

  pub fn max_attempts(&self) -> u32 {
    self.max_retries.saturating_add(1)
  }

  /// Delay slept before retry number `retry` (1-based).
  pub fn delay_for(&self, retry: u32) -> Duration {
    let exponent = retry.saturating_sub(1);
    let factor = 1u32.checked_shl(exponent).unwrap_or(u32::MAX);
    let delay = self.base_delay.saturating_mul(factor);
    match self.max_delay {
      Some(cap) => delay.min(cap),
      None => delay,
    }
  }

  /// Run `op` until it succeeds, the budget is spent, or `cancel` fires.
  ///
  /// `op` receives the zero-based attempt index. Cancellation interrupts both
  /// an in-flight attempt and a backoff sleep and is never retried.
  pub async fn run<T, F, Fut>(&self, cancel: &CancellationToken, mut op: F) -> Result<T, FetchError>
  where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
  {
    let mut attempts = 0u32;

    loop {
      let result = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(FetchError::Cancelled),
        result = op(attempts) => result,
      };

      let err = match result {
        Ok(value) => return Ok(value),
        Err(FetchError::Cancelled) => return Err(FetchError::Cancelled),
        Err(err) => err,
      };

      attempts += 1;
      let fail_fast = self.fail_fast_on_terminal && !err.is_retryable();
      if attempts > self.max_retries || fail_fast {
        return Err(FetchError::Exhausted {
          attempts,
          source: Box::new(err),
        });
      }

      let delay = self.delay_for(attempts);
      debug!(attempt = attempts, ?delay, error = %err, "Upstream request failed, backing off");

      tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(FetchError::Cancelled),
        _ = tokio::time::sleep(delay) => {}
      }
    }
  }
}
