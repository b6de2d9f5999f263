//! Retry bookkeeping and exponential backoff.

use std::time::Duration;

use rand::Rng;

/// Backoff before retry number `retry_count + 1`: `2^retry_count * base`.
///
/// With `jitter` the delay is drawn uniformly from `[0, computed)`.
pub fn backoff_for(retry_count: u32, base: Duration, jitter: bool) -> Duration {
    let computed = base.saturating_mul(2u32.saturating_pow(retry_count));
    if jitter && !computed.is_zero() {
        let secs = rand::rng().random_range(0.0..computed.as_secs_f64());
        return Duration::from_secs_f64(secs);
    }
    computed
}

/// Per-execution retry state of one fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryState {
    pub retry_count: u32,
    pub max_retries: u32,
    pub last_backoff: Duration,
}

impl RetryState {
    pub fn new(max_retries: u32) -> Self {
        Self {
            retry_count: 0,
            max_retries,
            last_backoff: Duration::ZERO,
        }
    }

    pub fn can_retry(&self) -> bool {
        self.retry_count < self.max_retries
    }

    /// Delay to sleep before the next attempt.
    ///
    /// Successive delays never shrink: a computed delay below the previous
    /// one has the previous one added to it.
    pub fn next_backoff(&self, base: Duration, jitter: bool) -> Duration {
        let backoff = backoff_for(self.retry_count, base, jitter);
        if backoff < self.last_backoff {
            backoff + self.last_backoff
        } else {
            backoff
        }
    }

    /// Count one retry and remember its backoff
    pub fn record(&mut self, backoff: Duration) {
        if self.can_retry() {
            self.retry_count += 1;
            self.last_backoff = backoff;
        }
    }
}
