//! Harness configuration.

use std::ops::RangeInclusive;
use std::time::Duration;

/// Tuning for a harness run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HarnessConfig {
    /// Delay between commit-status sweeps.
    pub poll_interval: Duration,
    /// Total wall-clock bound on one commit wait.
    pub commit_timeout: Duration,
    /// Range initial key values are drawn from.
    pub initial_values: RangeInclusive<i64>,
    /// Seed for client and key ordering. `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            commit_timeout: Duration::from_secs(120),
            initial_values: 5..=1000,
            seed: None,
        }
    }
}
