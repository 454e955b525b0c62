//! Per execution group tick timing

use super::ring_buffer::RingBuffer;
use std::time::{Duration, Instant};

/// Measures how long each run of an execution group takes.
pub struct TickTimer {
    tick_start: Instant,
    ticks: u64,
    tick_times: RingBuffer,
}

impl TickTimer {
    pub fn new(capacity: usize) -> Self {
        Self {
            tick_start: Instant::now(),
            ticks: 0,
            tick_times: RingBuffer::new(capacity),
        }
    }

    pub fn begin(&mut self) {
        self.tick_start = Instant::now();
    }

    pub fn end(&mut self) {
        self.tick_times.push(self.tick_start.elapsed());
        self.ticks += 1;
    }

    /// Number of completed ticks since creation.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Rolling average tick duration.
    pub fn tick_time(&self) -> Duration {
        self.tick_times.average()
    }

    /// Shortest and longest tick in the window.
    pub fn tick_time_range(&self) -> (Duration, Duration) {
        self.tick_times.min_max()
    }
}

impl Default for TickTimer {
    fn default() -> Self {
        Self::new(60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_completed_ticks() {
        let mut timer = TickTimer::new(4);
        for _ in 0..3 {
            timer.begin();
            timer.end();
        }
        assert_eq!(timer.ticks(), 3);
        let (min, max) = timer.tick_time_range();
        assert!(min <= max);
    }
}
