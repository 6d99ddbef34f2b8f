/*!
 * Synchronization Traits
 *
 * The seam between the uniform lock/condvar contract and the backend that
 * implements it.
 *
 * # Design: Trait-Based Backends Selected at Build Time
 *
 * A backend bundles four raw primitives. The public `Mutex`, `Condvar`,
 * `RwLock` and `SpinLock` types are generic over the backend and own the
 * lifecycle, ownership and accounting logic once, so every backend exposes
 * identical observable semantics. Dispatch is static (monomorphization).
 */

use crate::core::errors::SyncResult;
use std::time::Instant;

/// Result of a wake operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeResult {
    /// Successfully woke N waiters (N >= 1)
    Woken(usize),
    /// No waiters were waiting
    NoWaiters,
}

impl WakeResult {
    #[inline(always)]
    pub(crate) fn from_count(count: usize) -> Self {
        if count == 0 {
            WakeResult::NoWaiters
        } else {
            WakeResult::Woken(count)
        }
    }

    /// Check if any waiters were woken
    #[inline(always)]
    pub fn is_woken(&self) -> bool {
        matches!(self, WakeResult::Woken(_))
    }

    /// Get number of woken waiters (0 if none)
    #[inline(always)]
    pub fn count(&self) -> usize {
        match self {
            WakeResult::Woken(n) => *n,
            WakeResult::NoWaiters => 0,
        }
    }
}

/// How a condition-variable wait ended
///
/// A timeout is an expected outcome the caller branches on, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// Woken by `signal` or `broadcast`
    Signaled,
    /// The deadline passed before any wake-up reached this waiter
    TimedOut,
}

impl WaitOutcome {
    #[inline(always)]
    pub fn timed_out(&self) -> bool {
        matches!(self, WaitOutcome::TimedOut)
    }
}

/// Exclusive lock supplied by a backend
pub trait RawLock: Send + Sync {
    fn new() -> Self;

    /// Block until acquired
    fn lock(&self);

    fn try_lock(&self) -> bool;

    /// # Safety
    ///
    /// The lock must be held.
    unsafe fn unlock(&self);

    fn is_locked(&self) -> bool;
}

/// Shared/exclusive lock supplied by a backend
pub trait RawSharedLock: Send + Sync {
    /// False when shared acquisition degrades to exclusive acquisition
    const CONCURRENT_READERS: bool;

    fn new() -> Self;

    fn lock_shared(&self);

    fn try_lock_shared(&self) -> bool;

    fn lock_exclusive(&self);

    fn try_lock_exclusive(&self) -> bool;

    /// # Safety
    ///
    /// A shared hold must be outstanding.
    unsafe fn unlock_shared(&self);

    /// # Safety
    ///
    /// The exclusive hold must be outstanding.
    unsafe fn unlock_exclusive(&self);

    fn is_locked(&self) -> bool;
}

/// Condition variable supplied by a backend
pub trait RawCondvar: Send + Sync {
    fn new() -> Self;

    /// Acquire whatever backing resources the condvar needs before first use
    fn prepare(&self) -> SyncResult<()>;

    /// Give back the resources taken by `prepare`
    fn retire(&self);

    /// Block the calling thread until notified or `deadline` passes
    ///
    /// `release` runs exactly once on success, after the caller is registered
    /// as a waiter and before it blocks, so a notify issued after `release`
    /// can never be missed. On `Err` nothing was registered and `release`
    /// did not run.
    fn wait<F: FnOnce()>(&self, release: F, deadline: Option<Instant>) -> SyncResult<WaitOutcome>;

    /// Wake at most one waiter, returning how many were woken
    fn notify_one(&self) -> usize;

    /// Wake every current waiter, returning how many were woken
    fn notify_all(&self) -> usize;

    /// Approximate number of blocked waiters (for diagnostics and destroy checks)
    fn waiters(&self) -> usize;
}

/// A family of raw primitives with one uniform contract
pub trait SyncBackend: Send + Sync + 'static {
    const NAME: &'static str;

    type Lock: RawLock;
    type SharedLock: RawSharedLock;
    type Condvar: RawCondvar;
    type SpinLock: RawLock;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wake_result_from_count() {
        assert_eq!(WakeResult::from_count(0), WakeResult::NoWaiters);
        assert_eq!(WakeResult::from_count(3), WakeResult::Woken(3));
        assert_eq!(WakeResult::Woken(2).count(), 2);
        assert!(!WakeResult::NoWaiters.is_woken());
    }

    #[test]
    fn test_wait_outcome() {
        assert!(WaitOutcome::TimedOut.timed_out());
        assert!(!WaitOutcome::Signaled.timed_out());
    }
}
