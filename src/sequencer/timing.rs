//! Simulated timing parameters and display formatting

use std::time::Duration;

use rand::Rng;

use crate::common::config::TimingConfig;
use crate::common::{Error, Result};

/// Delays and cosmetic ranges used by the sequencer
#[derive(Debug, Clone, PartialEq)]
pub struct Timing {
    pub connect_delay: Duration,
    pub step_delay_min: Duration,
    pub step_delay_max: Duration,
    pub inter_step_delay: Duration,
    pub display_duration_min_secs: f64,
    pub display_duration_max_secs: f64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            connect_delay: Duration::from_millis(500),
            step_delay_min: Duration::from_millis(300),
            step_delay_max: Duration::from_millis(800),
            inter_step_delay: Duration::from_millis(200),
            display_duration_min_secs: 0.1,
            display_duration_max_secs: 2.5,
        }
    }
}

impl TryFrom<&TimingConfig> for Timing {
    type Error = Error;

    fn try_from(config: &TimingConfig) -> Result<Self> {
        if config.step_delay_min_ms > config.step_delay_max_ms {
            return Err(Error::Config(format!(
                "timing.step_delay_min_ms ({}) exceeds timing.step_delay_max_ms ({})",
                config.step_delay_min_ms, config.step_delay_max_ms
            )));
        }

        let (min, max) = (
            config.display_duration_min_secs,
            config.display_duration_max_secs,
        );
        if !min.is_finite() || !max.is_finite() || min < 0.0 || min > max {
            return Err(Error::Config(format!(
                "timing.display_duration range {}..{} is not a valid non-negative range",
                min, max
            )));
        }

        Ok(Self {
            connect_delay: Duration::from_millis(config.connect_delay_ms),
            step_delay_min: Duration::from_millis(config.step_delay_min_ms),
            step_delay_max: Duration::from_millis(config.step_delay_max_ms),
            inter_step_delay: Duration::from_millis(config.inter_step_delay_ms),
            display_duration_min_secs: min,
            display_duration_max_secs: max,
        })
    }
}

impl Timing {
    /// Timing with every delay at zero, for hosts that only want results
    pub fn immediate() -> Self {
        Self {
            connect_delay: Duration::ZERO,
            step_delay_min: Duration::ZERO,
            step_delay_max: Duration::ZERO,
            inter_step_delay: Duration::ZERO,
            ..Self::default()
        }
    }

    /// Draw a per-step delay, uniform over the configured range
    pub fn sample_step_delay<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        let min = self.step_delay_min.as_millis() as u64;
        let max = self.step_delay_max.as_millis() as u64;
        Duration::from_millis(rng.gen_range(min..=max))
    }

    /// Draw the cosmetic duration shown for a test, in seconds
    pub fn sample_display_duration<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        rng.gen_range(self.display_duration_min_secs..=self.display_duration_max_secs)
    }
}

/// Format an elapsed time as `m:ss`
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{}:{:02}", secs / 60, secs % 60)
}

/// Format a per-test duration as shown in the results table
pub fn format_test_duration(secs: f64) -> String {
    format!("{:.2}s", secs)
}
