/*!
 * Memory Types
 * Common types for the instrumented allocator
 */

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Memory operation result
pub type MemoryResult<T> = Result<T, MemoryError>;

/// Errors from the safe buffer layer
///
/// The raw allocator reports failure as `None`, like the system allocator.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Diagnostic)]
pub enum MemoryError {
    #[error("Out of memory: requested {requested} bytes")]
    #[diagnostic(code(memory::allocation_failed))]
    AllocationFailed { requested: usize },

    #[error("Size overflow: {count} elements of {size} bytes")]
    #[diagnostic(
        code(memory::size_overflow),
        help("The element count times the element size does not fit in usize.")
    )]
    SizeOverflow { count: usize, size: usize },
}

/// Point-in-time view of one statistics record
///
/// Fields are read one at a time, so a snapshot taken during concurrent
/// allocation is approximate. `peak_bytes_in_use` is never reported below
/// `total_bytes_in_use`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryStatsSnapshot {
    pub total_bytes_in_use: usize,
    pub peak_bytes_in_use: usize,
    pub live_block_count: usize,
}

impl MemoryStatsSnapshot {
    /// JSON form for metrics endpoints
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.live_block_count == 0 && self.total_bytes_in_use == 0
    }
}

impl std::fmt::Display for MemoryStatsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{} bytes in {} blocks (peak {} bytes)",
            self.total_bytes_in_use, self.live_block_count, self.peak_bytes_in_use
        )
    }
}
