//! Bounded exponential-backoff retry for provider calls.
//!
//! [`retry`] runs a fallible async operation up to `max_retries + 1` times,
//! sleeping between attempts with a doubling delay capped at
//! [`RetryConfig::max_delay`]. The backoff sleep is raced against the
//! cancellation token, so a caller-requested stop is observed without
//! waiting out the delay.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::error::{RestructureError, Result};

/// Configuration for the retry driver.
///
/// Invalid values are normalized rather than rejected: a zero `base_delay`
/// becomes the smallest representable delay, and a `max_delay` below
/// `base_delay` is raised to it.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use transcript_restructure::RetryConfig;
///
/// let config = RetryConfig::new(5, Duration::from_secs(1), Duration::from_secs(30));
/// assert_eq!(config.max_retries, 5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Maximum number of retries after the initial attempt.
    pub max_retries: u32,

    /// Delay before the first retry. Doubles on each subsequent retry.
    pub base_delay: Duration,

    /// Upper bound on the delay between retries.
    pub max_delay: Duration,
}

impl RetryConfig {
    /// Create a config with the given retry budget and delay bounds.
    pub fn new(max_retries: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            max_delay,
        }
    }

    /// Return a copy with degenerate delays repaired.
    pub fn normalized(self) -> Self {
        let base_delay = if self.base_delay.is_zero() {
            Duration::from_nanos(1)
        } else {
            self.base_delay
        };
        let max_delay = self.max_delay.max(base_delay);
        Self {
            max_retries: self.max_retries,
            base_delay,
            max_delay,
        }
    }
}

impl Default for RetryConfig {
    /// 3 retries, 1 s initial delay, 30 s cap.
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

/// Run `operation` with bounded exponential backoff.
///
/// The first attempt always runs, even if `cancel` is already fired;
/// cancellation is observed on the retry waits. Errors for which
/// `should_retry` returns `false` are returned unwrapped, preserving the
/// chain for kind matching by the caller. When the budget is exhausted the
/// last error is wrapped in [`RestructureError::RetriesExhausted`].
pub async fn retry<T, F, Fut, P>(
    cancel: &CancellationToken,
    config: RetryConfig,
    mut operation: F,
    should_retry: P,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
    P: Fn(&RestructureError) -> bool,
{
    let config = config.normalized();
    let mut delay = config.base_delay;
    let mut attempt: u32 = 0;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !should_retry(&err) {
                    return Err(err);
                }
                if attempt >= config.max_retries {
                    return Err(RestructureError::RetriesExhausted {
                        attempts: config.max_retries,
                        source: Box::new(err),
                    });
                }
                warn!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "transient failure, backing off before retry"
                );
                attempt += 1;

                if cancel.is_cancelled() {
                    return Err(RestructureError::Cancelled);
                }
                tokio::select! {
                    _ = cancel.cancelled() => return Err(RestructureError::Cancelled),
                    _ = tokio::time::sleep(delay) => {}
                }
                delay = (delay * 2).min(config.max_delay);
            }
        }
    }
}
