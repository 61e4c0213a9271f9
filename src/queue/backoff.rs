//! Exponential backoff with jitter for transport retries.

use std::time::Duration;

use rand::Rng;

/// Exponential backoff schedule.
///
/// Each call to [`Backoff::next_delay`] doubles the base delay up to `max`
/// and adds up to 25% random jitter so restarted consumers do not retry in
/// lockstep.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    /// Create a schedule starting at `initial` and capped at `max`.
    pub fn new(initial: Duration, max: Duration) -> Self {
        let max = max.max(initial);
        Self {
            initial,
            max,
            current: initial,
        }
    }

    /// Delay to wait before the next attempt.
    pub fn next_delay(&mut self) -> Duration {
        let base = self.current;
        self.current = (self.current * 2).min(self.max);
        with_jitter(base)
    }

    /// Delay before retrying a message that has failed `attempt` times.
    ///
    /// Stateless form of the same schedule, for retries that are tracked by
    /// the queue rather than by the caller.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let doublings = attempt.saturating_sub(1).min(31);
        let base = self
            .initial
            .checked_mul(1u32 << doublings)
            .map_or(self.max, |delay| delay.min(self.max));
        with_jitter(base)
    }

    /// Return to the initial delay after a successful attempt.
    pub fn reset(&mut self) {
        self.current = self.initial;
    }
}

/// Add up to 25% random jitter.
fn with_jitter(base: Duration) -> Duration {
    let jitter_ms = (base.as_millis() as u64) / 4;
    if jitter_ms == 0 {
        return base;
    }
    base + Duration::from_millis(rand::rng().random_range(0..=jitter_ms))
}
