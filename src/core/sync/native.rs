/*!
 * Native Backend
 *
 * Platform-native primitives:
 * - Mutex: parking_lot raw mutex (futex-style fast path, parks on contention)
 * - RwLock: parking_lot raw rwlock with concurrent readers
 * - Condvar: parking_lot_core park/unpark keyed by the condvar address
 * - SpinLock: test-and-test-and-set with three-phase backoff
 *
 * # Condvar wake-up ordering
 *
 * The waiter is queued under the parking-lot bucket lock before the user
 * mutex is released (inside `before_sleep`). A signal that follows the
 * release therefore always finds the waiter in the queue.
 */

use super::traits::{RawCondvar, RawLock, RawSharedLock, SyncBackend, WaitOutcome};
use crate::core::errors::SyncResult;
use crate::core::limits::{DEFAULT_SPIN_LIMIT, DEFAULT_YIELD_LIMIT, MAX_SPIN_BACKOFF_NS};
use parking_lot::lock_api;
use parking_lot_core::{ParkResult, DEFAULT_PARK_TOKEN, DEFAULT_UNPARK_TOKEN};
use std::hint;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Platform-native backend
#[derive(Debug, Clone, Copy, Default)]
pub struct Native;

impl SyncBackend for Native {
    const NAME: &'static str = "native";

    type Lock = NativeLock;
    type SharedLock = NativeSharedLock;
    type Condvar = NativeCondvar;
    type SpinLock = NativeSpinLock;
}

/// Native exclusive lock
pub struct NativeLock(parking_lot::RawMutex);

impl RawLock for NativeLock {
    fn new() -> Self {
        Self(<parking_lot::RawMutex as lock_api::RawMutex>::INIT)
    }

    #[inline]
    fn lock(&self) {
        lock_api::RawMutex::lock(&self.0)
    }

    #[inline]
    fn try_lock(&self) -> bool {
        lock_api::RawMutex::try_lock(&self.0)
    }

    #[inline]
    unsafe fn unlock(&self) {
        lock_api::RawMutex::unlock(&self.0)
    }

    #[inline]
    fn is_locked(&self) -> bool {
        lock_api::RawMutex::is_locked(&self.0)
    }
}

/// Native reader/writer lock
pub struct NativeSharedLock(parking_lot::RawRwLock);

impl RawSharedLock for NativeSharedLock {
    const CONCURRENT_READERS: bool = true;

    fn new() -> Self {
        Self(<parking_lot::RawRwLock as lock_api::RawRwLock>::INIT)
    }

    #[inline]
    fn lock_shared(&self) {
        lock_api::RawRwLock::lock_shared(&self.0)
    }

    #[inline]
    fn try_lock_shared(&self) -> bool {
        lock_api::RawRwLock::try_lock_shared(&self.0)
    }

    #[inline]
    fn lock_exclusive(&self) {
        lock_api::RawRwLock::lock_exclusive(&self.0)
    }

    #[inline]
    fn try_lock_exclusive(&self) -> bool {
        lock_api::RawRwLock::try_lock_exclusive(&self.0)
    }

    #[inline]
    unsafe fn unlock_shared(&self) {
        lock_api::RawRwLock::unlock_shared(&self.0)
    }

    #[inline]
    unsafe fn unlock_exclusive(&self) {
        lock_api::RawRwLock::unlock_exclusive(&self.0)
    }

    #[inline]
    fn is_locked(&self) -> bool {
        lock_api::RawRwLock::is_locked(&self.0)
    }
}

/// Native condition variable
///
/// # Performance
///
/// No allocation and no internal lock: waiters live in the global
/// parking-lot hash table keyed by this condvar's address.
pub struct NativeCondvar {
    waiters: AtomicUsize,
}

impl NativeCondvar {
    #[inline(always)]
    fn key(&self) -> usize {
        self as *const Self as usize
    }
}

impl RawCondvar for NativeCondvar {
    fn new() -> Self {
        Self {
            waiters: AtomicUsize::new(0),
        }
    }

    fn prepare(&self) -> SyncResult<()> {
        Ok(())
    }

    fn retire(&self) {}

    fn wait<F: FnOnce()>(&self, release: F, deadline: Option<Instant>) -> SyncResult<WaitOutcome> {
        let validate = || {
            self.waiters.fetch_add(1, Ordering::Relaxed);
            true
        };

        // SAFETY: the key is this condvar's own address and stays valid while
        // we are parked on it. The callbacks never panic and never park.
        let result = unsafe {
            parking_lot_core::park(
                self.key(),
                validate,
                release,
                |_, _| {},
                DEFAULT_PARK_TOKEN,
                deadline,
            )
        };
        self.waiters.fetch_sub(1, Ordering::Relaxed);

        Ok(match result {
            ParkResult::TimedOut => WaitOutcome::TimedOut,
            ParkResult::Unparked(_) | ParkResult::Invalid => WaitOutcome::Signaled,
        })
    }

    fn notify_one(&self) -> usize {
        // SAFETY: the callback does not call into parking_lot_core
        unsafe { parking_lot_core::unpark_one(self.key(), |_| DEFAULT_UNPARK_TOKEN) }
            .unparked_threads
    }

    fn notify_all(&self) -> usize {
        // SAFETY: unparking our own key
        unsafe { parking_lot_core::unpark_all(self.key(), DEFAULT_UNPARK_TOKEN) }
    }

    fn waiters(&self) -> usize {
        self.waiters.load(Ordering::Relaxed)
    }
}

/// Three-phase backoff: spin, then yield, then short sleeps
struct Backoff {
    step: u32,
}

impl Backoff {
    fn new() -> Self {
        Self { step: 0 }
    }

    fn snooze(&mut self) {
        if self.step < DEFAULT_SPIN_LIMIT {
            for _ in 0..(1u32 << self.step.min(6)) {
                hint::spin_loop();
            }
        } else if self.step < DEFAULT_SPIN_LIMIT + DEFAULT_YIELD_LIMIT {
            thread::yield_now();
        } else {
            let exp = (self.step - DEFAULT_SPIN_LIMIT - DEFAULT_YIELD_LIMIT).min(20);
            let nanos = (1_000u64 << exp).min(MAX_SPIN_BACKOFF_NS);
            thread::sleep(Duration::from_nanos(nanos));
        }
        self.step = self.step.saturating_add(1);
    }
}

/// Busy-waiting lock for very short critical sections
pub struct NativeSpinLock {
    locked: AtomicBool,
}

impl RawLock for NativeSpinLock {
    fn new() -> Self {
        Self {
            locked: AtomicBool::new(false),
        }
    }

    fn lock(&self) {
        let mut backoff = Backoff::new();
        while !self.try_lock() {
            while self.locked.load(Ordering::Relaxed) {
                backoff.snooze();
            }
        }
    }

    #[inline]
    fn try_lock(&self) -> bool {
        self.locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    #[inline]
    unsafe fn unlock(&self) {
        self.locked.store(false, Ordering::Release);
    }

    #[inline]
    fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Relaxed)
    }
}
