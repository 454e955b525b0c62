//! GameKit Metrics - tick and system timing for the scheduler
//!
//! Provides zero-cost abstractions for timing that completely vanish in
//! production builds via feature flags.
//!
//! # Feature Flags
//!
//! - `metrics` - Enable timing collection (default: disabled)
//!
//! # Usage
//!
//! ```ignore
//! use gamekit_metrics::{SystemProfiler, TickTimer};
//!
//! let mut timer = TickTimer::new(60); // Track last 60 ticks
//! timer.begin();
//! // ... run every system of the group ...
//! timer.end();
//! println!("tick: {:?}", timer.tick_time());
//!
//! let mut profiler = SystemProfiler::new();
//! let start = std::time::Instant::now();
//! // ... one system update ...
//! profiler.record(42, start.elapsed());
//! ```
//!
//! Without the `metrics` feature every method is a no-op and every query
//! returns zero.

#[cfg(feature = "metrics")]
mod ring_buffer;
#[cfg(feature = "metrics")]
mod system_profiler;
#[cfg(feature = "metrics")]
mod tick_timer;

#[cfg(feature = "metrics")]
pub use system_profiler::SystemProfiler;
#[cfg(feature = "metrics")]
pub use tick_timer::TickTimer;

/// Whether timing collection was compiled in.
pub const ENABLED: bool = cfg!(feature = "metrics");

// ============================================================================
// No-op stubs when metrics disabled
// ============================================================================

#[cfg(not(feature = "metrics"))]
#[derive(Debug, Default)]
pub struct TickTimer;

#[cfg(not(feature = "metrics"))]
impl TickTimer {
    pub fn new(_capacity: usize) -> Self { Self }
    pub fn begin(&mut self) {}
    pub fn end(&mut self) {}
    pub fn ticks(&self) -> u64 { 0 }
    pub fn tick_time(&self) -> std::time::Duration { std::time::Duration::ZERO }
    pub fn tick_time_range(&self) -> (std::time::Duration, std::time::Duration) {
        (std::time::Duration::ZERO, std::time::Duration::ZERO)
    }
}

#[cfg(not(feature = "metrics"))]
#[derive(Debug, Default)]
pub struct SystemProfiler;

#[cfg(not(feature = "metrics"))]
impl SystemProfiler {
    pub fn new() -> Self { Self }
    pub fn record(&mut self, _system: u32, _elapsed: std::time::Duration) {}
    pub fn timing(&self, _system: u32) -> std::time::Duration { std::time::Duration::ZERO }
    pub fn forget(&mut self, _system: u32) {}
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_compiles_without_metrics() {
        // Ensure stubs compile when metrics feature is disabled
        let mut timer = super::TickTimer::new(60);
        timer.begin();
        timer.end();
        let mut profiler = super::SystemProfiler::new();
        profiler.record(7, std::time::Duration::from_millis(1));
        assert!(profiler.timing(7) <= std::time::Duration::from_millis(1));
    }
}
