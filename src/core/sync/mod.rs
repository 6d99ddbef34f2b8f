/*!
 * Synchronization Primitives
 *
 * Mutex, condition variable, reader/writer lock and spin lock with one
 * contract across platforms:
 * - Native backend: parking_lot locks and park/unpark condvars
 * - Emulated backend: handle-based mutex and a waiter-chain condvar, for
 *   platforms without native condition variables
 *
 * # Architecture
 *
 * Each public type is generic over a [`SyncBackend`] and defaults to the one
 * selected at build time (`emulated-sync` feature). Lifecycle checks,
 * ownership tracking and the rwlock mode flag live in the generic layer, so
 * both backends behave identically to callers.
 *
 * # Performance
 *
 * - Zero-cost abstractions via monomorphization
 * - Native condvar needs no allocation and no internal lock
 * - Emulated condvar allocates its waiter chain once at init
 */

mod condvar;
mod emulated;
mod exclusive;
mod lifecycle;
mod mutex;
mod native;
mod rwlock;
mod spin;
mod traits;

pub use condvar::Condvar;
pub use emulated::{DegradedSharedLock, Emulated, Event, HandleLock, WaiterChain};
pub use mutex::{Mutex, MutexGuard};
pub use native::{Native, NativeCondvar, NativeLock, NativeSharedLock, NativeSpinLock};
pub use rwlock::{ReadGuard, RwLock, WriteGuard};
pub use spin::{SpinGuard, SpinLock};
pub use traits::{RawCondvar, RawLock, RawSharedLock, SyncBackend, WaitOutcome, WakeResult};

/// Backend used when none is named
#[cfg(not(feature = "emulated-sync"))]
pub type DefaultBackend = Native;
#[cfg(feature = "emulated-sync")]
pub type DefaultBackend = Emulated;

/// Name of the backend compiled in as the default
#[inline]
pub fn backend_name() -> &'static str {
    DefaultBackend::NAME
}
