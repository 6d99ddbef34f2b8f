/*!
 * Spin Lock
 *
 * Exclusive lock for critical sections of a few instructions. The native
 * backend busy-waits with backoff; the emulated backend falls back to its
 * mutex. Observable semantics are those of a mutex either way.
 */

use super::exclusive::LockCore;
use super::traits::SyncBackend;
use super::DefaultBackend;
use crate::core::errors::SyncResult;
use std::fmt;
use std::marker::PhantomData;

const KIND: &str = "spin lock";

pub struct SpinLock<B: SyncBackend = DefaultBackend> {
    core: LockCore<B::SpinLock>,
}

impl<B: SyncBackend> SpinLock<B> {
    /// Uninitialized spin lock
    pub fn new() -> Self {
        Self {
            core: LockCore::new(KIND),
        }
    }

    pub fn create() -> Self {
        Self {
            core: LockCore::ready(KIND),
        }
    }

    pub fn init(&self) -> SyncResult<()> {
        self.core.init()
    }

    pub fn destroy(&self) -> SyncResult<()> {
        self.core.destroy()
    }

    pub fn lock(&self) -> SyncResult<()> {
        self.core.lock()
    }

    pub fn try_lock(&self) -> SyncResult<bool> {
        self.core.try_lock()
    }

    pub fn unlock(&self) -> SyncResult<()> {
        self.core.unlock()
    }

    pub fn guard(&self) -> SyncResult<SpinGuard<'_, B>> {
        self.lock()?;
        Ok(SpinGuard {
            lock: self,
            _not_send: PhantomData,
        })
    }

    #[inline]
    pub fn is_locked(&self) -> bool {
        self.core.is_locked()
    }
}

impl<B: SyncBackend> Default for SpinLock<B> {
    fn default() -> Self {
        Self::create()
    }
}

impl<B: SyncBackend> fmt::Debug for SpinLock<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpinLock")
            .field("backend", &B::NAME)
            .field("locked", &self.is_locked())
            .finish()
    }
}

#[must_use = "if unused the SpinLock will immediately unlock"]
pub struct SpinGuard<'a, B: SyncBackend = DefaultBackend> {
    lock: &'a SpinLock<B>,
    _not_send: PhantomData<*const ()>,
}

impl<B: SyncBackend> Drop for SpinGuard<'_, B> {
    fn drop(&mut self) {
        let _ = self.lock.unlock();
    }
}
