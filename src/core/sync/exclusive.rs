/*!
 * Exclusive Lock Core
 *
 * Lifecycle and ownership bookkeeping around a backend's raw exclusive lock.
 * Shared by `Mutex` and `SpinLock`.
 */

use super::lifecycle::{Lifecycle, Owner};
use super::traits::RawLock;
use crate::core::errors::SyncResult;

pub(crate) struct LockCore<R: RawLock> {
    raw: R,
    owner: Owner,
    lifecycle: Lifecycle,
}

impl<R: RawLock> LockCore<R> {
    pub fn new(kind: &'static str) -> Self {
        Self {
            raw: R::new(),
            owner: Owner::new(),
            lifecycle: Lifecycle::new(kind),
        }
    }

    pub fn ready(kind: &'static str) -> Self {
        Self {
            raw: R::new(),
            owner: Owner::new(),
            lifecycle: Lifecycle::ready(kind),
        }
    }

    pub fn init(&self) -> SyncResult<()> {
        self.lifecycle.init()
    }

    pub fn destroy(&self) -> SyncResult<()> {
        self.lifecycle.destroy(self.raw.is_locked())
    }

    pub fn lock(&self) -> SyncResult<()> {
        self.lifecycle.check()?;
        self.raw.lock();
        self.owner.claim();
        Ok(())
    }

    pub fn try_lock(&self) -> SyncResult<bool> {
        self.lifecycle.check()?;
        if self.raw.try_lock() {
            self.owner.claim();
            Ok(true)
        } else {
            Ok(false)
        }
    }

    pub fn unlock(&self) -> SyncResult<()> {
        self.lifecycle.check()?;
        self.owner.check(self.lifecycle.kind())?;
        self.owner.clear();
        // SAFETY: the owner check proves the calling thread holds the lock
        unsafe { self.raw.unlock() };
        Ok(())
    }

    #[inline]
    pub fn is_locked(&self) -> bool {
        self.raw.is_locked()
    }

    /// Verify the calling thread may hand this lock to a condvar wait
    pub fn check_held(&self) -> SyncResult<()> {
        self.lifecycle.check()?;
        self.owner.check(self.lifecycle.kind())
    }

    /// Release on behalf of a condvar wait (ownership already checked)
    pub fn release_for_wait(&self) {
        self.owner.clear();
        // SAFETY: `check_held` succeeded before the wait began
        unsafe { self.raw.unlock() };
    }

    /// Take the lock back after a condvar wait returns
    pub fn reacquire(&self) {
        self.raw.lock();
        self.owner.claim();
    }
}
