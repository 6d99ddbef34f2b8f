/*!
 * System Limits and Constants
 *
 * Centralized location for the layer's limits, thresholds and error codes.
 * Performance-critical constants are marked with [PERF].
 */

// =============================================================================
// ERROR CODES
// =============================================================================

/// Operation not permitted (unlock by a thread that does not own the lock)
pub const EPERM: i32 = 1;

/// Cannot allocate memory (lock/condvar resources exhausted)
pub const ENOMEM: i32 = 12;

/// Resource busy (double init, destroy while locked or waited on)
pub const EBUSY: i32 = 16;

/// Invalid argument (use of a never-initialized or destroyed primitive)
pub const EINVAL: i32 = 22;

// =============================================================================
// ALLOCATOR
// =============================================================================

/// Alignment of every block handed out by the instrumented allocator.
/// Matches the strictest fundamental alignment on the supported targets.
pub const BLOCK_ALIGN: usize = 16;

/// Bytes reserved in front of every user pointer for the block header.
/// Two machine words rounded up to `BLOCK_ALIGN` so user pointers stay aligned.
pub const HEADER_SIZE: usize = {
    let words = 2 * std::mem::size_of::<usize>();
    (words + BLOCK_ALIGN - 1) / BLOCK_ALIGN * BLOCK_ALIGN
};

// =============================================================================
// THREAD IDENTITY
// =============================================================================

/// Default bound on foreign-thread registrations before a warning is logged.
/// Foreign threads are expected to be few (crypto engine helpers and the like).
pub const DEFAULT_FOREIGN_THREAD_LIMIT: usize = 256;

/// Size of the per-thread scratch buffer carried by every thread record
pub const THREAD_SCRATCH_SIZE: usize = 4;

// =============================================================================
// SYNCHRONIZATION
// =============================================================================

/// Tight-spin iterations before the native spin lock starts yielding
/// [PERF] Best for critical sections of a few hundred nanoseconds
pub const DEFAULT_SPIN_LIMIT: u32 = 10;

/// Iterations (including the spin phase) before the spin lock starts sleeping
pub const DEFAULT_YIELD_LIMIT: u32 = 50;

/// Upper bound on the exponential sleep of the spin lock's last phase
pub const MAX_SPIN_BACKOFF_NS: u64 = 1_000_000;

/// Waiter slots reserved when an emulated condition variable is initialized
pub const INITIAL_WAITER_CAPACITY: usize = 8;
