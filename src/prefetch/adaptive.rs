//! Adaptive batch sizing.
//!
//! Multiplicative decrease / additive increase on batch size, with a single
//! delay factor applied in both directions.

use std::time::Duration;

use serde::Serialize;

/// Batch size and inter-batch delay carried from one batch to the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatchState {
    pub batch_size: usize,
    #[serde(rename = "delay_ms", serialize_with = "serialize_millis")]
    pub delay: Duration,
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdaptivePolicy {
    pub initial_batch_size: usize,
    pub min_batch_size: usize,
    pub max_batch_size: usize,
    pub initial_delay: Duration,
    pub min_delay: Duration,
    pub max_delay: Duration,
    /// Failure rate above which the job backs off
    pub high_water: f64,
    /// Failure rate below which the job speeds up
    pub low_water: f64,
    /// Batch size multiplier on back-off
    pub decrease_factor: f64,
    /// Batch size increment on speed-up
    pub increase_step: usize,
    /// Delay multiplier on back-off, divisor on speed-up
    pub delay_factor: f64,
}

impl Default for AdaptivePolicy {
    fn default() -> Self {
        Self {
            initial_batch_size: 5,
            min_batch_size: 1,
            max_batch_size: 10,
            initial_delay: Duration::from_millis(500),
            min_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(8),
            high_water: 0.5,
            low_water: 0.1,
            decrease_factor: 0.5,
            increase_step: 1,
            delay_factor: 2.0,
        }
    }
}

impl AdaptivePolicy {
    /// Batch size bounds, with `max >= min >= 1`.
    fn size_bounds(&self) -> (usize, usize) {
        let min = self.min_batch_size.max(1);
        (min, self.max_batch_size.max(min))
    }

    /// Delay bounds, with `max >= min`.
    fn delay_bounds(&self) -> (Duration, Duration) {
        (self.min_delay, self.max_delay.max(self.min_delay))
    }

    pub fn initial_state(&self) -> BatchState {
        let (min_size, max_size) = self.size_bounds();
        let (min_delay, max_delay) = self.delay_bounds();
        BatchState {
            batch_size: self.initial_batch_size.clamp(min_size, max_size),
            delay: self.initial_delay.clamp(min_delay, max_delay),
        }
    }

    /// Next state after a batch that failed at `failure_rate` (0.0..=1.0).
    pub fn adjust(&self, state: BatchState, failure_rate: f64) -> BatchState {
        let (min_size, max_size) = self.size_bounds();
        let (min_delay, max_delay) = self.delay_bounds();

        if failure_rate > self.high_water {
            let shrunk = (state.batch_size as f64 * self.decrease_factor).floor() as usize;
            BatchState {
                batch_size: shrunk.clamp(min_size, max_size),
                delay: state
                    .delay
                    .mul_f64(self.delay_factor)
                    .clamp(min_delay, max_delay),
            }
        } else if failure_rate < self.low_water {
            BatchState {
                batch_size: (state.batch_size + self.increase_step).clamp(min_size, max_size),
                delay: state
                    .delay
                    .div_f64(self.delay_factor)
                    .clamp(min_delay, max_delay),
            }
        } else {
            state
        }
    }
}
