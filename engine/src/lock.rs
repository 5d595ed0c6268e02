//! Tree mutex with re-entrancy detection.

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, MutexGuard};

static NEXT_THREAD_TAG: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static THREAD_TAG: u64 = NEXT_THREAD_TAG.fetch_add(1, Ordering::Relaxed);
}

fn current_tag() -> u64 {
    THREAD_TAG.with(|tag| *tag)
}

/// Mutex guarding one tree's state.
///
/// Locking a tree from the thread that already holds it would deadlock;
/// debug builds turn that into an immediate panic instead.
#[derive(Debug, Default)]
pub(crate) struct TreeLock<T> {
    inner: Mutex<T>,
    owner: AtomicU64,
}

impl<T> TreeLock<T> {
    pub(crate) fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(value),
            owner: AtomicU64::new(0),
        }
    }

    pub(crate) fn lock(&self) -> TreeGuard<'_, T> {
        let tag = current_tag();
        debug_assert_ne!(
            self.owner.load(Ordering::Acquire),
            tag,
            "sync tree re-entered from a thread that already holds its lock"
        );
        let guard = self.inner.lock();
        self.owner.store(tag, Ordering::Release);
        TreeGuard { guard, lock: self }
    }
}

pub(crate) struct TreeGuard<'a, T> {
    guard: MutexGuard<'a, T>,
    lock: &'a TreeLock<T>,
}

impl<T> Drop for TreeGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.owner.store(0, Ordering::Release);
    }
}

impl<T> Deref for TreeGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T> DerefMut for TreeGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard
    }
}
