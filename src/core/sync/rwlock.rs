/*!
 * Reader/Writer Lock
 *
 * Shared / exclusive lock with one unlock operation for both modes. The `rw`
 * flag records which mode the current hold is in, so `unlock` knows what to
 * release.
 *
 * On backends without concurrent readers, `rdlock` takes the exclusive lock.
 * Correctness is unchanged; only reader concurrency is lost.
 *
 * Shared holds are recorded by thread identity, so a shared `unlock` from a
 * thread holding nothing is refused like a foreign unlock of a mutex.
 */

use super::lifecycle::{Lifecycle, Owner};
use super::traits::{RawSharedLock, SyncBackend};
use super::DefaultBackend;
use crate::core::errors::{SyncError, SyncResult};
use crate::core::thread::current_thread_id;
use parking_lot::Mutex;
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};

const KIND: &str = "rwlock";

pub struct RwLock<B: SyncBackend = DefaultBackend> {
    raw: B::SharedLock,
    /// Set while the hold is exclusive
    rw: AtomicBool,
    /// One entry per outstanding shared hold
    readers: Mutex<Vec<u64>>,
    writer: Owner,
    lifecycle: Lifecycle,
}

impl<B: SyncBackend> RwLock<B> {
    /// Uninitialized lock
    pub fn new() -> Self {
        Self {
            raw: B::SharedLock::new(),
            rw: AtomicBool::new(false),
            readers: Mutex::new(Vec::new()),
            writer: Owner::new(),
            lifecycle: Lifecycle::new(KIND),
        }
    }

    /// Lock that is already initialized
    pub fn create() -> Self {
        Self {
            lifecycle: Lifecycle::ready(KIND),
            ..Self::new()
        }
    }

    pub fn init(&self) -> SyncResult<()> {
        self.lifecycle.init()
    }

    /// Fails with `Busy` while held in either mode
    pub fn destroy(&self) -> SyncResult<()> {
        self.lifecycle.destroy(self.raw.is_locked())
    }

    /// Acquire shared
    pub fn rdlock(&self) -> SyncResult<()> {
        self.lifecycle.check()?;
        self.raw.lock_shared();
        self.readers.lock().push(current_thread_id());
        Ok(())
    }

    pub fn try_rdlock(&self) -> SyncResult<bool> {
        self.lifecycle.check()?;
        if self.raw.try_lock_shared() {
            self.readers.lock().push(current_thread_id());
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Acquire exclusive
    pub fn wrlock(&self) -> SyncResult<()> {
        self.lifecycle.check()?;
        self.raw.lock_exclusive();
        self.enter_exclusive();
        Ok(())
    }

    pub fn try_wrlock(&self) -> SyncResult<bool> {
        self.lifecycle.check()?;
        if self.raw.try_lock_exclusive() {
            self.enter_exclusive();
            Ok(true)
        } else {
            Ok(false)
        }
    }

    #[inline]
    fn enter_exclusive(&self) {
        self.rw.store(true, Ordering::Release);
        self.writer.claim();
    }

    /// Release whichever mode the calling thread holds
    pub fn unlock(&self) -> SyncResult<()> {
        self.lifecycle.check()?;

        if self.rw.load(Ordering::Acquire) {
            self.writer.check(KIND)?;
            self.writer.clear();
            self.rw.store(false, Ordering::Release);
            // SAFETY: the caller is the exclusive holder
            unsafe { self.raw.unlock_exclusive() };
            return Ok(());
        }

        let me = current_thread_id();
        let mut readers = self.readers.lock();
        let Some(pos) = readers.iter().rposition(|&id| id == me) else {
            drop(readers);
            debug_assert!(false, "{KIND} released by a thread that does not hold it");
            return Err(SyncError::NotOwner(KIND));
        };
        readers.swap_remove(pos);
        drop(readers);
        // SAFETY: the caller's shared hold was outstanding
        unsafe { self.raw.unlock_shared() };
        Ok(())
    }

    pub fn read(&self) -> SyncResult<ReadGuard<'_, B>> {
        self.rdlock()?;
        Ok(ReadGuard {
            lock: self,
            _not_send: PhantomData,
        })
    }

    pub fn write(&self) -> SyncResult<WriteGuard<'_, B>> {
        self.wrlock()?;
        Ok(WriteGuard {
            lock: self,
            _not_send: PhantomData,
        })
    }

    /// Number of shared holds outstanding
    #[inline]
    pub fn readers(&self) -> usize {
        self.readers.lock().len()
    }

    #[inline]
    pub fn is_write_locked(&self) -> bool {
        self.rw.load(Ordering::Acquire)
    }

    /// False when this backend serializes readers
    #[inline]
    pub fn concurrent_readers(&self) -> bool {
        B::SharedLock::CONCURRENT_READERS
    }
}

impl<B: SyncBackend> Default for RwLock<B> {
    fn default() -> Self {
        Self::create()
    }
}

impl<B: SyncBackend> fmt::Debug for RwLock<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RwLock")
            .field("backend", &B::NAME)
            .field("readers", &self.readers())
            .field("write_locked", &self.is_write_locked())
            .finish()
    }
}

#[must_use = "if unused the RwLock will immediately unlock"]
pub struct ReadGuard<'a, B: SyncBackend = DefaultBackend> {
    lock: &'a RwLock<B>,
    _not_send: PhantomData<*const ()>,
}

impl<B: SyncBackend> Drop for ReadGuard<'_, B> {
    fn drop(&mut self) {
        let _ = self.lock.unlock();
    }
}

#[must_use = "if unused the RwLock will immediately unlock"]
pub struct WriteGuard<'a, B: SyncBackend = DefaultBackend> {
    lock: &'a RwLock<B>,
    _not_send: PhantomData<*const ()>,
}

impl<B: SyncBackend> Drop for WriteGuard<'_, B> {
    fn drop(&mut self) {
        let _ = self.lock.unlock();
    }
}
