//! Learning time statistics
//!
//! Wall-clock accounting of the step and episode learning hooks.

use std::fmt;
use std::time::{Duration, Instant};

/// Accumulated duration of one kind of learning call
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PhaseTiming {
    count: u64,
    total: Duration,
    max: Duration,
}

impl PhaseTiming {
    pub fn record(&mut self, elapsed: Duration) {
        self.count += 1;
        self.total += elapsed;
        self.max = self.max.max(elapsed);
    }

    /// Number of recorded calls
    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn total(&self) -> Duration {
        self.total
    }

    /// Longest single call
    pub fn max(&self) -> Duration {
        self.max
    }

    /// Mean call duration, zero before the first call
    pub fn mean(&self) -> Duration {
        match u32::try_from(self.count) {
            Ok(0) => Duration::ZERO,
            Ok(n) => self.total / n,
            Err(_) => Duration::from_secs_f64(self.total.as_secs_f64() / self.count as f64),
        }
    }
}

impl fmt::Display for PhaseTiming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "total={:.3}ms, mean={:.3}ms, max={:.3}ms (n={})",
                self.total.as_secs_f64() * 1e3,
                self.mean().as_secs_f64() * 1e3,
                self.max.as_secs_f64() * 1e3,
                self.count
            )
        }
    }
}

/// Step and episode learning timings
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LearningTiming {
    pub step: PhaseTiming,
    pub episode: PhaseTiming,
}

impl LearningTiming {
    /// Run `f`, charging its duration to the step statistics
    pub fn time_step<R>(&mut self, f: impl FnOnce() -> R) -> R {
        let start = Instant::now();
        let out = f();
        self.step.record(start.elapsed());
        out
    }

    /// Run `f`, charging its duration to the episode statistics
    pub fn time_episode<R>(&mut self, f: impl FnOnce() -> R) -> R {
        let start = Instant::now();
        let out = f();
        self.episode.record(start.elapsed());
        out
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
