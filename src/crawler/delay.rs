//! Randomized request delay
//!
//! Each outbound request is preceded by a pause drawn uniformly from
//! `[min, max]`. The pause is taken by the worker that issues the request,
//! not by a shared limiter: with `n` concurrent workers the aggregate request
//! rate is roughly `n` times the single-worker rate.

use rand::Rng;
use std::time::Duration;

/// Uniformly distributed pause before a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RandomDelay {
    min: Duration,
    max: Duration,
}

impl RandomDelay {
    /// Creates a delay drawn from `[min, max]`; the bounds are swapped if given
    /// in the wrong order
    pub fn new(min: Duration, max: Duration) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    /// No delay at all
    pub fn none() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    pub fn min(&self) -> Duration {
        self.min
    }

    pub fn max(&self) -> Duration {
        self.max
    }

    /// Draws the next pause length
    pub fn sample(&self) -> Duration {
        if self.min == self.max {
            return self.min;
        }
        rand::thread_rng().gen_range(self.min..=self.max)
    }

    /// Sleeps for a freshly drawn pause
    pub async fn wait(&self) {
        let pause = self.sample();
        if !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }
    }
}
