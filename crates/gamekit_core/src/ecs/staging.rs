// staging.rs - Add/remove buffers written by any thread, drained by one owner

use parking_lot::Mutex;

/// Pending additions and removals for a container that is only mutated
/// during its owner's tick.
pub(crate) struct Staging<T> {
    added: Mutex<Vec<T>>,
    removed: Mutex<Vec<T>>,
}

impl<T: PartialEq> Staging<T> {
    pub(crate) fn new() -> Self {
        Self {
            added: Mutex::new(Vec::new()),
            removed: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn stage_added(&self, item: T) {
        self.added.lock().push(item);
    }

    /// Returns `false` if the item was already staged for removal.
    pub(crate) fn stage_removed(&self, item: T) -> bool {
        let mut removed = self.removed.lock();
        if removed.contains(&item) {
            return false;
        }
        removed.push(item);
        true
    }

    pub(crate) fn take_added(&self) -> Vec<T> {
        std::mem::take(&mut *self.added.lock())
    }

    pub(crate) fn take_removed(&self) -> Vec<T> {
        std::mem::take(&mut *self.removed.lock())
    }

    /// Drop pending additions that were removed before ever being merged.
    pub(crate) fn discard_added(&self, removed: &[T]) {
        self.added.lock().retain(|item| !removed.contains(item));
    }

    pub(crate) fn pending_added(&self) -> usize {
        self.added.lock().len()
    }

    pub(crate) fn pending_removed(&self) -> usize {
        self.removed.lock().len()
    }

    pub(crate) fn is_removal_pending(&self, item: &T) -> bool {
        self.removed.lock().contains(item)
    }
}
