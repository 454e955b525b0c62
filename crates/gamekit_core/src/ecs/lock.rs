// lock.rs - Lock hooks that serialize a system's tick against outside access

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};

/// Optional per-system lock taken around every tick and around direct
/// (hook-driven) insertions into the system's active set.
///
/// `lock`/`try_lock` and `unlock` must be paired on the same thread.
pub trait SystemLock: Send + Sync {
    fn try_lock(&self) -> bool;
    fn lock(&self);
    fn unlock(&self);
}

/// Recursive mutex usable both as a [`SystemLock`] and through RAII guards.
#[derive(Default)]
pub struct RecursiveLock {
    mutex: ReentrantMutex<()>,
}

impl RecursiveLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn guard(&self) -> ReentrantMutexGuard<'_, ()> {
        self.mutex.lock()
    }

    pub fn try_guard(&self) -> Option<ReentrantMutexGuard<'_, ()>> {
        self.mutex.try_lock()
    }

    pub fn is_locked(&self) -> bool {
        self.mutex.is_locked()
    }
}

impl SystemLock for RecursiveLock {
    fn try_lock(&self) -> bool {
        match self.mutex.try_lock() {
            Some(guard) => {
                std::mem::forget(guard);
                true
            }
            None => false,
        }
    }

    fn lock(&self) {
        std::mem::forget(self.mutex.lock());
    }

    fn unlock(&self) {
        assert!(
            self.mutex.is_owned_by_current_thread(),
            "Lock must be released by the thread that acquired it"
        );
        // SAFETY: the current thread holds at least one forgotten guard from
        // `lock`/`try_lock`, which this call releases.
        unsafe { self.mutex.force_unlock() };
    }
}

/// Holds an optional [`SystemLock`] until dropped.
pub(crate) struct LockHold<'a>(Option<&'a dyn SystemLock>);

impl<'a> LockHold<'a> {
    pub(crate) fn acquire(lock: Option<&'a dyn SystemLock>) -> Self {
        if let Some(lock) = lock {
            lock.lock();
        }
        Self(lock)
    }
}

impl Drop for LockHold<'_> {
    fn drop(&mut self) {
        if let Some(lock) = self.0 {
            lock.unlock();
        }
    }
}
