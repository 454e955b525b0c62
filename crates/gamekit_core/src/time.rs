//! Wall-clock time for timed execution groups

use std::time::{Duration, Instant};

/// Default tick rate of a lane (60 Hz = 16.666ms per tick)
pub const DEFAULT_TICK_RATE_HZ: u32 = 60;
pub const DEFAULT_TICK_DURATION: Duration = Duration::from_micros(16_666); // ~16.666ms

/// Interval between ticks for a lane running at `hz` ticks per second.
pub fn tick_interval(hz: u32) -> Duration {
    if hz == 0 {
        return DEFAULT_TICK_DURATION;
    }
    Duration::from_secs_f64(1.0 / f64::from(hz))
}

/// Tracks when an execution group last ran.
///
/// The first run reports a zero delta; every following run reports the
/// wall-clock time since the previous one.
#[derive(Debug, Default)]
pub struct GroupClock {
    last_run: Option<Instant>,
}

impl GroupClock {
    pub fn new() -> Self {
        Self { last_run: None }
    }

    pub fn advance(&mut self) -> Duration {
        let now = Instant::now();
        let delta = self
            .last_run
            .map(|last| now.saturating_duration_since(last))
            .unwrap_or(Duration::ZERO);
        self.last_run = Some(now);
        delta
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_run_has_zero_delta() {
        let mut clock = GroupClock::new();
        assert_eq!(clock.advance(), Duration::ZERO);
        std::thread::sleep(Duration::from_millis(2));
        assert!(clock.advance() >= Duration::from_millis(2));
    }

    #[test]
    fn zero_rate_uses_default_interval() {
        assert_eq!(tick_interval(0), DEFAULT_TICK_DURATION);
        assert_eq!(tick_interval(100), Duration::from_millis(10));
    }
}
