/*!
 * Sysport Core Library
 * Cross-platform concurrency and diagnostics primitives
 *
 * - Atomic counters with a lock-based fallback backend
 * - Mutex, condition variable, reader/writer lock and spin lock with a
 *   uniform contract over native and emulated backends
 * - Stable per-thread identity
 * - Instrumented allocator with per-record statistics and call-site tracing
 */

pub mod core;
pub mod memory;
pub mod monitoring;

// Re-exports
pub use crate::core::errors::{status_code, SyncError, SyncResult};
pub use crate::core::sync::{
    Condvar, Emulated, Mutex, MutexGuard, Native, ReadGuard, RwLock, SpinGuard, SpinLock,
    SyncBackend, WaitOutcome, WakeResult, WriteGuard,
};
pub use crate::core::thread::{current_thread_id, register_worker, ThreadRegistry, ThreadRole};
pub use crate::core::{Config, Context, Counter, WideCounter};
pub use memory::{Allocator, MemoryError, MemoryStats, MemoryStatsSnapshot, StatsHandle, TrackedBuffer};
pub use monitoring::init_tracing;
