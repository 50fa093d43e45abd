//! Retry deadline tracking and backoff computation.

use std::time::Duration;

use rand::Rng;
use tokio::time::Instant;

use crate::{KrakenError, Result};

const BACKOFF_GROWTH: f64 = 1.5;

/// Per-call retry state. Created when a logical call starts and dropped when
/// it ends; never shared between calls.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RetrySession {
    first_attempt: Instant,
    attempts: u32,
}

impl RetrySession {
    pub(crate) fn start() -> Self {
        Self {
            first_attempt: Instant::now(),
            attempts: 0,
        }
    }

    /// Number of retries scheduled so far; `0` while on the original attempt.
    pub(crate) fn attempts(&self) -> u32 {
        self.attempts
    }

    pub(crate) fn elapsed(&self) -> Duration {
        self.first_attempt.elapsed()
    }

    pub(crate) fn record_retry(&mut self) {
        self.attempts += 1;
    }
}

/// Enforces the overall retry budget and computes jittered backoff.
#[derive(Debug, Clone)]
pub(crate) struct RetryScheduler {
    budget: Duration,
    base_delay: Duration,
}

impl RetryScheduler {
    pub(crate) fn new(budget: Duration, base_delay: Duration) -> Self {
        Self { budget, base_delay }
    }

    /// Fails with [`KrakenError::Timeout`] once the session has run past the
    /// budget.
    pub(crate) fn should_retry(&self, session: &RetrySession) -> Result<()> {
        let elapsed = session.elapsed();
        if elapsed > self.budget {
            #[cfg(feature = "tracing")]
            tracing::warn!(
                "retry budget of {} ms exhausted after {} attempts ({} ms elapsed)",
                self.budget.as_millis(),
                session.attempts() + 1,
                elapsed.as_millis()
            );
            return Err(KrakenError::Timeout);
        }
        Ok(())
    }

    /// Un-jittered delay before retry `attempt`: zero for the original
    /// attempt, then `base * 1.5^(attempt - 1)`.
    pub(crate) fn base_delay(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let exp = (attempt - 1).min(64) as i32;
        let cap = self.budget.max(self.base_delay);
        let secs = self.base_delay.as_secs_f64() * BACKOFF_GROWTH.powi(exp);
        Duration::try_from_secs_f64(secs).map_or(cap, |delay| delay.min(cap))
    }

    /// Delay before retry `attempt`, scaled by a uniform factor in `[0.5, 1.5)`.
    pub(crate) fn delay(&self, attempt: u32) -> Duration {
        let jitter = rand::thread_rng().gen_range(0.5..1.5);
        self.base_delay(attempt).mul_f64(jitter)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{RetryScheduler, RetrySession};
    use crate::KrakenError;

    fn scheduler() -> RetryScheduler {
        RetryScheduler::new(Duration::from_secs(60), Duration::from_millis(500))
    }

    #[test]
    fn base_delay_grows_by_half_per_retry() {
        let scheduler = scheduler();
        assert_eq!(scheduler.base_delay(0), Duration::ZERO);
        assert_eq!(scheduler.base_delay(1), Duration::from_millis(500));
        assert_eq!(scheduler.base_delay(2), Duration::from_millis(750));
        assert_eq!(scheduler.base_delay(3), Duration::from_micros(1_125_000));
    }

    #[test]
    fn base_delay_is_capped_by_the_budget() {
        let scheduler = scheduler();
        assert_eq!(scheduler.base_delay(40), Duration::from_secs(60));
    }

    #[test]
    fn jitter_stays_within_half_and_one_and_a_half() {
        let scheduler = scheduler();
        for attempt in 1..6 {
            let base = scheduler.base_delay(attempt);
            for _ in 0..200 {
                let delay = scheduler.delay(attempt);
                assert!(delay >= base.mul_f64(0.5));
                assert!(delay <= base.mul_f64(1.5));
            }
        }
        assert_eq!(scheduler.delay(0), Duration::ZERO);
    }

    #[test]
    fn session_counts_retries() {
        let mut session = RetrySession::start();
        assert_eq!(session.attempts(), 0);
        session.record_retry();
        session.record_retry();
        assert_eq!(session.attempts(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_fails_only_after_budget_is_exceeded() {
        let scheduler = RetryScheduler::new(Duration::from_secs(2), Duration::from_millis(500));
        let session = RetrySession::start();
        assert!(scheduler.should_retry(&session).is_ok());

        tokio::time::sleep(Duration::from_millis(1_900)).await;
        assert!(scheduler.should_retry(&session).is_ok());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(matches!(
            scheduler.should_retry(&session),
            Err(KrakenError::Timeout)
        ));
    }
}
