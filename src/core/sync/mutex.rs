/*!
 * Mutex
 *
 * Exclusive lock with explicit init / destroy lifecycle.
 */

use super::exclusive::LockCore;
use super::traits::SyncBackend;
use super::DefaultBackend;
use crate::core::errors::SyncResult;
use std::fmt;
use std::marker::PhantomData;

const KIND: &str = "mutex";

/// Exclusive lock over the selected backend
///
/// `new` yields an uninitialized mutex that must be `init`ed before use;
/// `create` (and `Default`) yield one that is ready.
///
/// # Example
///
/// ```
/// use sysport_core::Mutex;
///
/// let m: Mutex = Mutex::create();
/// m.lock().unwrap();
/// m.unlock().unwrap();
/// ```
pub struct Mutex<B: SyncBackend = DefaultBackend> {
    core: LockCore<B::Lock>,
}

impl<B: SyncBackend> Mutex<B> {
    /// Uninitialized mutex
    pub fn new() -> Self {
        Self {
            core: LockCore::new(KIND),
        }
    }

    /// Mutex that is already initialized
    pub fn create() -> Self {
        Self {
            core: LockCore::ready(KIND),
        }
    }

    pub fn init(&self) -> SyncResult<()> {
        self.core.init()
    }

    /// Fails with `Busy` while held
    pub fn destroy(&self) -> SyncResult<()> {
        self.core.destroy()
    }

    /// Block until the calling thread holds the mutex
    pub fn lock(&self) -> SyncResult<()> {
        self.core.lock()
    }

    /// Acquire without blocking; `Ok(false)` if another thread holds it
    pub fn try_lock(&self) -> SyncResult<bool> {
        self.core.try_lock()
    }

    /// Release; only the holding thread may unlock
    pub fn unlock(&self) -> SyncResult<()> {
        self.core.unlock()
    }

    /// Lock and return a guard that unlocks on drop
    pub fn guard(&self) -> SyncResult<MutexGuard<'_, B>> {
        self.lock()?;
        Ok(MutexGuard::new(self))
    }

    pub fn try_guard(&self) -> SyncResult<Option<MutexGuard<'_, B>>> {
        Ok(self.try_lock()?.then(|| MutexGuard::new(self)))
    }

    #[inline]
    pub fn is_locked(&self) -> bool {
        self.core.is_locked()
    }

    #[inline]
    pub fn backend(&self) -> &'static str {
        B::NAME
    }

    #[inline]
    pub(crate) fn core(&self) -> &LockCore<B::Lock> {
        &self.core
    }
}

impl<B: SyncBackend> Default for Mutex<B> {
    fn default() -> Self {
        Self::create()
    }
}

impl<B: SyncBackend> fmt::Debug for Mutex<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mutex")
            .field("backend", &B::NAME)
            .field("locked", &self.is_locked())
            .finish()
    }
}

/// RAII hold on a [`Mutex`]
///
/// Not `Send`: the mutex must be released by the thread that locked it.
#[must_use = "if unused the Mutex will immediately unlock"]
pub struct MutexGuard<'a, B: SyncBackend = DefaultBackend> {
    mutex: &'a Mutex<B>,
    _not_send: PhantomData<*const ()>,
}

impl<'a, B: SyncBackend> MutexGuard<'a, B> {
    fn new(mutex: &'a Mutex<B>) -> Self {
        Self {
            mutex,
            _not_send: PhantomData,
        }
    }

    #[inline]
    pub fn mutex(&self) -> &'a Mutex<B> {
        self.mutex
    }
}

impl<B: SyncBackend> Drop for MutexGuard<'_, B> {
    fn drop(&mut self) {
        // Ownership holds by construction
        let _ = self.mutex.unlock();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::SyncError;
    use crate::core::sync::{Emulated, Native};

    fn lifecycle<B: SyncBackend>() {
        let m = Mutex::<B>::new();
        m.init().unwrap();
        assert_eq!(m.init(), Err(SyncError::AlreadyInitialized("mutex")));

        m.lock().unwrap();
        assert_eq!(m.destroy(), Err(SyncError::Busy("mutex")));
        assert_eq!(m.try_lock(), Ok(false));
        m.unlock().unwrap();
        m.destroy().unwrap();
    }

    #[test]
    fn test_lifecycle_native() {
        lifecycle::<Native>();
    }

    #[test]
    fn test_lifecycle_emulated() {
        lifecycle::<Emulated>();
    }

    #[test]
    fn test_guard_unlocks() {
        let m = Mutex::<Native>::create();
        {
            let _g = m.guard().unwrap();
            assert!(m.is_locked());
            assert!(m.try_guard().unwrap().is_none());
        }
        assert!(!m.is_locked());
    }
}
