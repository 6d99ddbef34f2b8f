/*!
 * Condition Variable
 *
 * Wait / timed wait / signal / broadcast over the selected backend.
 *
 * # Guarantees
 *
 * - No lost wake-up: a thread that holds the mutex, is registered as a
 *   waiter, and then releases the mutex is woken by any signal or broadcast
 *   issued after the release
 * - `signal` wakes at most one waiter; `broadcast` wakes every waiter
 *   registered before the call
 * - Every wait returns with the mutex re-acquired, including on timeout
 * - A timed wait never reports `TimedOut` before its deadline
 * - Spurious wake-ups are permitted; callers re-check their predicate
 */

use super::lifecycle::Lifecycle;
use super::mutex::{Mutex, MutexGuard};
use super::traits::{RawCondvar, SyncBackend, WaitOutcome, WakeResult};
use super::DefaultBackend;
use crate::core::errors::SyncResult;
use std::fmt;
use std::time::{Duration, Instant};

const KIND: &str = "condition variable";

/// Condition variable paired with a [`Mutex`] of the same backend
pub struct Condvar<B: SyncBackend = DefaultBackend> {
    raw: B::Condvar,
    lifecycle: Lifecycle,
}

impl<B: SyncBackend> Condvar<B> {
    /// Uninitialized condition variable
    pub fn new() -> Self {
        Self {
            raw: B::Condvar::new(),
            lifecycle: Lifecycle::new(KIND),
        }
    }

    /// Condition variable that is already initialized
    pub fn create() -> SyncResult<Self> {
        let cv = Self::new();
        cv.init()?;
        Ok(cv)
    }

    /// Fails with `ResourceExhausted` if backing objects cannot be created
    pub fn init(&self) -> SyncResult<()> {
        self.lifecycle.init()?;
        if let Err(e) = self.raw.prepare() {
            self.lifecycle.abort_init();
            return Err(e);
        }
        Ok(())
    }

    /// Fails with `Busy` while any thread waits
    pub fn destroy(&self) -> SyncResult<()> {
        self.lifecycle.destroy(self.raw.waiters() > 0)?;
        self.raw.retire();
        Ok(())
    }

    /// Release `mutex`, block until woken, re-acquire `mutex`
    ///
    /// The calling thread must hold `mutex`.
    pub fn wait(&self, mutex: &Mutex<B>) -> SyncResult<()> {
        self.wait_until(mutex, None).map(|_| ())
    }

    /// As [`wait`](Self::wait), giving up once `deadline` passes
    pub fn timed_wait(&self, mutex: &Mutex<B>, deadline: Instant) -> SyncResult<WaitOutcome> {
        self.wait_until(mutex, Some(deadline))
    }

    /// As [`timed_wait`](Self::timed_wait) with a relative timeout
    pub fn wait_for(&self, mutex: &Mutex<B>, timeout: Duration) -> SyncResult<WaitOutcome> {
        self.wait_until(mutex, Instant::now().checked_add(timeout))
    }

    /// Wait using the mutex held by `guard`
    pub fn wait_guard(&self, guard: &mut MutexGuard<'_, B>) -> SyncResult<()> {
        self.wait(guard.mutex())
    }

    /// Wait while `condition` holds, re-checking after every wake-up
    pub fn wait_while<F>(&self, guard: &mut MutexGuard<'_, B>, mut condition: F) -> SyncResult<()>
    where
        F: FnMut() -> bool,
    {
        while condition() {
            self.wait_guard(guard)?;
        }
        Ok(())
    }

    fn wait_until(&self, mutex: &Mutex<B>, deadline: Option<Instant>) -> SyncResult<WaitOutcome> {
        self.lifecycle.check()?;
        let core = mutex.core();
        core.check_held()?;

        let outcome = self.raw.wait(|| core.release_for_wait(), deadline)?;
        core.reacquire();
        Ok(outcome)
    }

    /// Wake at most one waiter
    pub fn signal(&self) -> SyncResult<WakeResult> {
        self.lifecycle.check()?;
        Ok(WakeResult::from_count(self.raw.notify_one()))
    }

    /// Wake every waiter registered before this call
    pub fn broadcast(&self) -> SyncResult<WakeResult> {
        self.lifecycle.check()?;
        Ok(WakeResult::from_count(self.raw.notify_all()))
    }

    /// Number of threads currently blocked (approximate)
    #[inline]
    pub fn waiters(&self) -> usize {
        self.raw.waiters()
    }
}

impl<B: SyncBackend> fmt::Debug for Condvar<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Condvar")
            .field("backend", &B::NAME)
            .field("waiters", &self.waiters())
            .finish()
    }
}
