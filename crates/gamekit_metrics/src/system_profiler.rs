//! Cumulative update time per component system

use std::collections::HashMap;
use std::time::Duration;

/// Accumulates time spent inside each system's update, keyed by system id.
pub struct SystemProfiler {
    timings: HashMap<u32, Duration>,
}

impl SystemProfiler {
    pub fn new() -> Self {
        Self {
            timings: HashMap::new(),
        }
    }

    /// Add an externally measured duration to a system's total.
    pub fn record(&mut self, system: u32, elapsed: Duration) {
        *self.timings.entry(system).or_insert(Duration::ZERO) += elapsed;
    }

    pub fn timing(&self, system: u32) -> Duration {
        self.timings.get(&system).copied().unwrap_or(Duration::ZERO)
    }

    /// Drop the accumulated time of a deregistered system.
    pub fn forget(&mut self, system: u32) {
        self.timings.remove(&system);
    }
}

impl Default for SystemProfiler {
    fn default() -> Self {
        Self::new()
    }
}
