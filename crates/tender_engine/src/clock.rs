use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of time and of blocking waits.
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

/// Wall clock; `sleep` blocks the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

/// Random delays used to keep the request rate irregular.
#[derive(Debug, Clone)]
pub struct Pacer {
    rng: StdRng,
}

impl Pacer {
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Uniform delay in `[0, max]`.
    pub fn jitter(&mut self, max: Duration) -> Duration {
        self.between(Duration::ZERO, max)
    }

    /// Uniform delay in `[min, max]`, millisecond resolution.
    pub fn between(&mut self, min: Duration, max: Duration) -> Duration {
        let low = min.as_millis() as u64;
        let high = max.as_millis() as u64;
        if high <= low {
            return min;
        }
        Duration::from_millis(self.rng.gen_range(low..=high))
    }
}
