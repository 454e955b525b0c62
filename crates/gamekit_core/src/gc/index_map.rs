// index_map.rs - Append-only segmented array with lock-free readers
//
// Segment k holds `base << k` slots and starts at index `base * (2^k - 1)`,
// so growing never moves existing slots. One writer thread appends and
// replaces; any number of threads read inside an epoch.

use crate::gc::epoch::{Epoch, EpochCollector};
use crossbeam_epoch::{self as ce, Atomic, Owned};
use once_cell::sync::OnceCell;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const MAX_SEGMENTS: usize = usize::BITS as usize - 1;

type Segment<T> = Box<[Atomic<T>]>;

pub struct ConcurrentIndexMap<T> {
    base: usize,
    len: AtomicUsize,
    segments: Box<[OnceCell<Segment<T>>]>,
    collector: Arc<EpochCollector>,
}

impl<T: Send + Sync + 'static> ConcurrentIndexMap<T> {
    /// # Panics
    /// If `base` is zero.
    pub fn new(base: usize, collector: Arc<EpochCollector>) -> Self {
        assert!(base > 0, "Segment capacity must be at least 1");
        Self {
            base,
            len: AtomicUsize::new(0),
            segments: (0..MAX_SEGMENTS).map(|_| OnceCell::new()).collect(),
            collector,
        }
    }

    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn collector(&self) -> &Arc<EpochCollector> {
        &self.collector
    }

    /// Append `value` and return its index. Writer thread only.
    pub fn append(&self, value: T) -> usize {
        let index = self.len.load(Ordering::Relaxed);
        let (segment, offset) = self.locate(index);
        let slots = self.segments[segment].get_or_init(|| {
            (0..self.base << segment)
                .map(|_| Atomic::null())
                .collect::<Segment<T>>()
        });
        slots[offset].store(Owned::new(value), Ordering::Release);
        self.len.store(index + 1, Ordering::Release);
        index
    }

    /// Swap the value at `index` (`None` empties the slot). The previous
    /// value is retired through the collector. Writer thread only.
    ///
    /// Returns `false` if `index` was never appended.
    pub fn replace(&self, index: usize, value: Option<T>) -> bool {
        let Some(slot) = self.slot(index) else {
            return false;
        };
        let epoch = self.collector.begin();
        let guard = epoch.guard();
        let previous = match value {
            Some(value) => slot.swap(Owned::new(value), Ordering::AcqRel, guard),
            None => slot.swap(ce::Shared::null(), Ordering::AcqRel, guard),
        };
        if !previous.is_null() {
            // SAFETY: the value was unlinked above and only the writer
            // retires slots, so it is retired exactly once.
            unsafe { guard.defer_destroy(previous) };
        }
        guard.flush();
        true
    }

    /// Value at `index`, valid for as long as `epoch` stays open.
    ///
    /// # Panics
    /// If `epoch` was begun on another collector.
    pub fn get<'e>(&'e self, index: usize, epoch: &'e Epoch) -> Option<&'e T> {
        assert!(
            self.collector.owns(epoch),
            "Epoch must come from the map's collector"
        );
        let slot = self.slot(index)?;
        let shared = slot.load(Ordering::Acquire, epoch.guard());
        // SAFETY: non-null slots point at live values; replaced values are
        // only freed after every epoch open at replacement time has ended.
        unsafe { shared.as_ref() }
    }

    /// Occupied slots below the length observed when iteration starts.
    pub fn iter<'e>(&'e self, epoch: &'e Epoch) -> impl Iterator<Item = (usize, &'e T)> + 'e {
        let len = self.len();
        (0..len).filter_map(move |index| self.get(index, epoch).map(|value| (index, value)))
    }

    fn slot(&self, index: usize) -> Option<&Atomic<T>> {
        if index >= self.len() {
            return None;
        }
        let (segment, offset) = self.locate(index);
        self.segments.get(segment)?.get()?.get(offset)
    }

    fn locate(&self, index: usize) -> (usize, usize) {
        let chunk = index / self.base + 1;
        let segment = (usize::BITS - 1 - chunk.leading_zeros()) as usize;
        let offset = index - self.base * ((1usize << segment) - 1);
        (segment, offset)
    }
}

impl<T> Drop for ConcurrentIndexMap<T> {
    fn drop(&mut self) {
        for segment in self.segments.iter_mut().filter_map(OnceCell::get_mut) {
            for slot in segment.iter() {
                // SAFETY: `&mut self` rules out readers, and retired values
                // were already unlinked and handed to the collector.
                unsafe {
                    let shared = slot.load(Ordering::Relaxed, ce::unprotected());
                    if !shared.is_null() {
                        drop(shared.into_owned());
                    }
                }
            }
        }
    }
}

impl<T> fmt::Debug for ConcurrentIndexMap<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConcurrentIndexMap")
            .field("base", &self.base)
            .field("len", &self.len.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
