use std::time::Duration;

const DEFAULT_GROWTH_PERCENT: u32 = 150;

/// Poll intervals for one confirmation attempt.
///
/// Starts at `base` and grows by `growth_percent` after every unsuccessful
/// poll until it reaches `max_interval`. The sequence never decreases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSchedule {
    base: Duration,
    max_interval: Duration,
    growth_percent: u32,
}

impl PollSchedule {
    pub fn new(base: Duration, max_interval: Duration) -> Self {
        Self {
            base,
            max_interval: max_interval.max(base),
            growth_percent: DEFAULT_GROWTH_PERCENT,
        }
    }

    pub fn base(&self) -> Duration {
        self.base
    }

    pub fn max_interval(&self) -> Duration {
        self.max_interval
    }

    pub fn intervals(&self) -> PollIntervals {
        PollIntervals {
            next: self.base,
            max_interval: self.max_interval,
            growth_percent: self.growth_percent,
        }
    }
}

/// Endless iterator over the intervals of a [`PollSchedule`].
#[derive(Debug, Clone)]
pub struct PollIntervals {
    next: Duration,
    max_interval: Duration,
    growth_percent: u32,
}

impl Iterator for PollIntervals {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        let current = self.next;
        let grown = current
            .checked_mul(self.growth_percent)
            .map(|d| d / 100)
            .unwrap_or(self.max_interval);
        self.next = grown.min(self.max_interval).max(current);
        Some(current)
    }
}

/// Total time a confirmation attempt may wait; later attempts get longer.
pub fn confirmation_window(max_wait: Duration, extension: Duration, attempt: u32) -> Duration {
    max_wait.saturating_add(extension.saturating_mul(attempt.saturating_sub(1)))
}

/// Pause between two navigation attempts, before jitter.
pub fn retry_delay(base: Duration, step: Duration, attempt: u32) -> Duration {
    base.saturating_add(step.saturating_mul(attempt))
}
