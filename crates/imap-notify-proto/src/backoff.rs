//! Capped exponential reconnect backoff with jitter.

use std::time::Duration;

use rand::Rng;

/// Reconnect timing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound for the un-jittered delay.
    pub max_delay: Duration,
    /// Consecutive failed attempts after which to give up. `None` retries
    /// forever.
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(120),
            max_attempts: None,
        }
    }
}

/// Relative jitter applied to every delay.
const JITTER: f64 = 0.2;

/// Backoff state between reconnect attempts.
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: ReconnectPolicy,
    current: Option<Duration>,
    failures: u32,
}

impl Backoff {
    /// Creates a fresh backoff.
    #[must_use]
    pub const fn new(policy: ReconnectPolicy) -> Self {
        Self {
            policy,
            current: None,
            failures: 0,
        }
    }

    /// Records a failed attempt and returns how long to wait before the next
    /// one, or `None` once the attempt budget is spent.
    pub fn next_delay(&mut self) -> Option<Duration> {
        let base = self.next_base()?;
        let factor = rand::thread_rng().gen_range((1.0 - JITTER)..=(1.0 + JITTER));
        Some(base.mul_f64(factor))
    }

    /// Like [`Backoff::next_delay`] without jitter.
    fn next_base(&mut self) -> Option<Duration> {
        self.failures = self.failures.saturating_add(1);
        if self
            .policy
            .max_attempts
            .is_some_and(|max| self.failures > max)
        {
            return None;
        }

        let base = self.current.map_or(self.policy.initial_delay, |prev| {
            prev.saturating_mul(2).min(self.policy.max_delay)
        });
        self.current = Some(base);
        Some(base)
    }

    /// Forgets past failures after a successful handshake.
    pub const fn reset(&mut self) {
        self.current = None;
        self.failures = 0;
    }

    /// Consecutive failures so far.
    #[must_use]
    pub const fn failures(&self) -> u32 {
        self.failures
    }
}
