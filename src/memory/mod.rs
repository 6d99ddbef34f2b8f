/*!
 * Memory Module
 * Instrumented allocation with per-record accounting and optional tracing
 */

pub mod allocator;
pub mod buffer;
mod header;
pub mod stats;
pub mod trace;
pub mod types;

pub use allocator::Allocator;
pub use buffer::TrackedBuffer;
pub use stats::{MemoryStats, StatsHandle};
pub use trace::{AllocationTrace, RecordingSink, TraceOp, TraceSink, TracingSink};
pub use types::*;

use crate::core::context::Context;
use std::ptr::NonNull;

/// Allocate through the process-wide context
#[track_caller]
pub fn allocate(size: usize) -> Option<NonNull<u8>> {
    Context::global().allocator().allocate(size)
}

/// Zeroed allocation through the process-wide context
#[track_caller]
pub fn zeroed_allocate(count: usize, size: usize) -> Option<NonNull<u8>> {
    Context::global().allocator().zeroed_allocate(count, size)
}

/// Reallocate through the process-wide context
///
/// # Safety
///
/// See [`Allocator::reallocate`].
#[track_caller]
pub unsafe fn reallocate(ptr: Option<NonNull<u8>>, new_size: usize) -> Option<NonNull<u8>> {
    Context::global().allocator().reallocate(ptr, new_size)
}

/// Free through the process-wide context
///
/// # Safety
///
/// See [`Allocator::free`].
#[track_caller]
pub unsafe fn free(ptr: Option<NonNull<u8>>) {
    Context::global().allocator().free(ptr)
}

/// Snapshot of the process-wide default record
pub fn stats() -> MemoryStatsSnapshot {
    Context::global().allocator().snapshot()
}
