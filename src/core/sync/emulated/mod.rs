/*!
 * Emulated Backend
 *
 * Primitives for platforms that lack native condition variables or
 * reader/writer locks. Everything is built from one kernel-object-like
 * building block, the auto-reset [`Event`]:
 * - Mutex: an event created set, used as a binary semaphore
 * - Condvar: a chain of per-thread events ([`WaiterChain`])
 * - RwLock: degrades to the mutex; readers exclude each other
 * - SpinLock: the mutex
 *
 * Observable semantics match the native backend except that readers are
 * serialized.
 */

mod event;
mod waiter_chain;

pub use event::Event;
pub use waiter_chain::WaiterChain;

use super::traits::{RawLock, RawSharedLock, SyncBackend};

/// Emulated backend
#[derive(Debug, Clone, Copy, Default)]
pub struct Emulated;

impl SyncBackend for Emulated {
    const NAME: &'static str = "emulated";

    type Lock = HandleLock;
    type SharedLock = DegradedSharedLock;
    type Condvar = WaiterChain;
    type SpinLock = HandleLock;
}

/// Exclusive lock built on a binary-semaphore handle
pub struct HandleLock {
    available: Event,
}

impl RawLock for HandleLock {
    fn new() -> Self {
        Self {
            available: Event::new(true),
        }
    }

    #[inline]
    fn lock(&self) {
        self.available.wait(None);
    }

    #[inline]
    fn try_lock(&self) -> bool {
        self.available.try_wait()
    }

    #[inline]
    unsafe fn unlock(&self) {
        self.available.set();
    }

    #[inline]
    fn is_locked(&self) -> bool {
        !self.available.is_set()
    }
}

/// Reader/writer lock where both modes take the exclusive lock
pub struct DegradedSharedLock(HandleLock);

impl RawSharedLock for DegradedSharedLock {
    const CONCURRENT_READERS: bool = false;

    fn new() -> Self {
        Self(HandleLock::new())
    }

    #[inline]
    fn lock_shared(&self) {
        self.0.lock()
    }

    #[inline]
    fn try_lock_shared(&self) -> bool {
        self.0.try_lock()
    }

    #[inline]
    fn lock_exclusive(&self) {
        self.0.lock()
    }

    #[inline]
    fn try_lock_exclusive(&self) -> bool {
        self.0.try_lock()
    }

    #[inline]
    unsafe fn unlock_shared(&self) {
        self.0.unlock()
    }

    #[inline]
    unsafe fn unlock_exclusive(&self) {
        self.0.unlock()
    }

    #[inline]
    fn is_locked(&self) -> bool {
        self.0.is_locked()
    }
}
