use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    Fixed,
    /// Delay multiplies by `factor` each attempt, capped at `max_delay`.
    Exponential { factor: u32, max_delay: Duration },
}

/// Bounded retry budget for the poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1000,
            delay: Duration::from_secs(20),
            backoff: Backoff::Fixed,
        }
    }
}

impl RetryPolicy {
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
            backoff: Backoff::Fixed,
        }
    }

    /// Wait before attempt `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.delay,
            Backoff::Exponential { factor, max_delay } => {
                if factor <= 1 {
                    return self.delay.min(max_delay);
                }
                let mut delay = self.delay;
                for _ in 1..attempt {
                    delay = delay.saturating_mul(factor);
                    if delay >= max_delay {
                        return max_delay;
                    }
                }
                delay.min(max_delay)
            }
        }
    }

    /// Sum of all waits if the budget is spent.
    pub fn total_budget(&self) -> Duration {
        (1..=self.max_attempts)
            .map(|attempt| self.delay_for(attempt))
            .fold(Duration::ZERO, Duration::saturating_add)
    }
}
