// epoch.rs - Deferred destruction bounded by reader epochs

use crossbeam_epoch::{Collector, Guard, LocalHandle};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

const SYNCHRONIZE_ATTEMPTS: usize = 10_000;

/// Collector that frees retired objects once no reader that could still
/// observe them remains inside an epoch.
#[derive(Default)]
pub struct EpochCollector {
    collector: Collector,
}

/// An open read epoch. Anything reachable when the epoch began stays alive
/// until it is dropped or [`Epoch::end`]ed.
pub struct Epoch {
    // Declared first so the pin is released before the handle.
    guard: Guard,
    _handle: LocalHandle,
}

impl EpochCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter a read epoch on the calling thread.
    pub fn begin(&self) -> Epoch {
        let handle = self.collector.register();
        let guard = handle.pin();
        Epoch {
            guard,
            _handle: handle,
        }
    }

    /// Retire `object`; `destructor` runs once every epoch that was open at
    /// this point has ended.
    pub fn manage<T, F>(&self, object: T, destructor: F)
    where
        T: Send + 'static,
        F: FnOnce(T) + Send + 'static,
    {
        let epoch = self.begin();
        epoch.guard.defer(move || destructor(object));
        epoch.guard.flush();
    }

    /// Try to advance the global epoch and run expired destructors.
    pub fn collect(&self) {
        self.begin().guard.flush();
    }

    /// Collect until everything retired before this call has been destroyed.
    ///
    /// Returns `false` if an open epoch kept the collector from advancing.
    pub fn synchronize(&self) -> bool {
        let done = Arc::new(AtomicBool::new(false));
        let marker = Arc::clone(&done);
        self.manage((), move |()| marker.store(true, Ordering::Release));
        for _ in 0..SYNCHRONIZE_ATTEMPTS {
            if done.load(Ordering::Acquire) {
                return true;
            }
            self.collect();
            thread::yield_now();
        }
        done.load(Ordering::Acquire)
    }

    pub(crate) fn owns(&self, epoch: &Epoch) -> bool {
        epoch.guard.collector() == Some(&self.collector)
    }
}

impl fmt::Debug for EpochCollector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EpochCollector").finish_non_exhaustive()
    }
}

impl Epoch {
    pub(crate) fn guard(&self) -> &Guard {
        &self.guard
    }

    pub fn end(self) {}
}
