use std::time::{Duration, Instant};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(200);
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(2);
pub const DEFAULT_BACKOFF_MULTIPLIER: u32 = 2;

/// Bounded exponential backoff applied to each platform call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per call, including the first one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            multiplier: DEFAULT_BACKOFF_MULTIPLIER,
        }
    }
}

impl RetryPolicy {
    /// Policy with the same attempt budget and no waiting between attempts.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            multiplier: DEFAULT_BACKOFF_MULTIPLIER,
        }
    }

    /// Delay to wait after `failed_attempts` consecutive failures, or `None`
    /// once the attempt budget is spent.
    pub fn backoff_after(&self, failed_attempts: u32) -> Option<Duration> {
        if failed_attempts == 0 {
            return Some(Duration::ZERO);
        }
        if failed_attempts >= self.max_attempts {
            return None;
        }
        let factor = self
            .multiplier
            .max(1)
            .saturating_pow(failed_attempts.saturating_sub(1));
        let delay = self
            .base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay);
        Some(delay.min(self.max_delay))
    }
}

/// Wall-clock budget of one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline(Option<Instant>);

impl Deadline {
    pub fn none() -> Self {
        Self(None)
    }

    pub fn at(instant: Instant) -> Self {
        Self(Some(instant))
    }

    pub fn after(remaining: Duration) -> Self {
        Self(Instant::now().checked_add(remaining))
    }

    /// Whether sleeping for `delay` from now would still end before the
    /// deadline.
    pub fn allows(&self, delay: Duration) -> bool {
        match self.0 {
            None => true,
            Some(deadline) => Instant::now()
                .checked_add(delay)
                .is_some_and(|wake_at| wake_at < deadline),
        }
    }
}
