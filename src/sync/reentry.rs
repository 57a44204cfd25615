//! Debug-build detection of callbacks that call back into the container running them.
//!
//! The callback passed to `upsert` runs under the write lock, and the one passed to
//! `get_with` under the read lock. Neither lock is reentrant, so a nested call from the
//! same thread would block forever. In debug builds that turns into a panic naming the
//! problem; release builds carry no state and do no checks.

use core::marker::PhantomData;

#[cfg(debug_assertions)]
use std::cell::RefCell;

#[cfg(debug_assertions)]
thread_local! {
    /// Containers whose callbacks are running on this thread, innermost last.
    static RUNNING: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };
}

#[derive(Debug, Default)]
pub(crate) struct ReentryGuard;

impl ReentryGuard {
    pub(crate) const fn new() -> Self {
        Self
    }

    #[cfg(debug_assertions)]
    fn addr(&self) -> usize {
        self as *const Self as usize
    }

    /// Panics (debug builds only) if the calling thread is inside one of this container's callbacks.
    #[inline]
    #[track_caller]
    pub(crate) fn check(&self) {
        #[cfg(debug_assertions)]
        assert!(
            !RUNNING.with(|running| running.borrow().contains(&self.addr())),
            "OrderedContainer called from inside its own upsert/get_with callback; this would deadlock"
        );
    }

    /// Marks the calling thread as running a callback until the returned scope drops.
    #[inline]
    pub(crate) fn enter(&self) -> CallbackScope<'_> {
        #[cfg(debug_assertions)]
        RUNNING.with(|running| running.borrow_mut().push(self.addr()));

        CallbackScope { _guard: PhantomData }
    }
}

pub(crate) struct CallbackScope<'a> {
    _guard: PhantomData<&'a ReentryGuard>,
}

#[cfg(debug_assertions)]
impl Drop for CallbackScope<'_> {
    fn drop(&mut self) {
        // Scopes on one thread nest, so ours is the innermost entry.
        let _ = RUNNING.try_with(|running| running.borrow_mut().pop());
    }
}
