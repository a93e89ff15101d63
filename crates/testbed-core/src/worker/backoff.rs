//! Poll backoff: how long an idle drain loop waits before polling again.

use std::time::Duration;

use rand::Rng;

use crate::config::WorkerConfig;

/// Exponential backoff between empty polls.
///
/// Example with min=10ms, multiplier=2.0, max=1s:
/// - empty poll 1: 10ms
/// - empty poll 2: 20ms
/// - empty poll 3: 40ms
/// - ...
/// - empty poll 8 and later: 1s
#[derive(Debug, Clone)]
pub struct PollBackoff {
    pub min_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl PollBackoff {
    pub fn from_config(config: &WorkerConfig) -> Self {
        Self {
            min_delay: config.min_backoff(),
            max_delay: config.max_backoff(),
            multiplier: config.multiplier,
        }
    }

    /// Delay after `empty_polls` consecutive empty polls (1-indexed).
    pub fn next_delay(&self, empty_polls: u32) -> Duration {
        let exponent = empty_polls.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.min_delay.as_secs_f64() * self.multiplier.powi(exponent);
        if !secs.is_finite() || secs >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        Duration::from_nanos((secs * 1e9).round() as u64)
    }

    /// `next_delay` scaled by a random factor in [0.5, 1.0] so idle workers
    /// don't poll the store in lockstep.
    pub fn jittered_delay(&self, empty_polls: u32) -> Duration {
        let factor = rand::thread_rng().gen_range(0.5..=1.0);
        self.next_delay(empty_polls).mul_f64(factor)
    }
}

impl Default for PollBackoff {
    fn default() -> Self {
        Self::from_config(&WorkerConfig::default())
    }
}
