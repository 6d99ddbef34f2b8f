/*!
 * Allocation Trace
 *
 * Diagnostic records emitted per allocation event when tracing is enabled.
 * Purely observational: a sink never influences allocator results.
 */

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::panic::Location;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

/// Kind of allocation event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TraceOp {
    Alloc,
    AllocFailed,
    Free,
    /// Old size released by a successful reallocation
    #[serde(rename = "r-free")]
    ReallocFree,
    /// New size charged by a successful reallocation
    #[serde(rename = "r-alloc")]
    ReallocAlloc,
    ReallocFailed,
}

impl TraceOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            TraceOp::Alloc => "alloc",
            TraceOp::AllocFailed => "alloc-failed",
            TraceOp::Free => "free",
            TraceOp::ReallocFree => "r-free",
            TraceOp::ReallocAlloc => "r-alloc",
            TraceOp::ReallocFailed => "realloc-failed",
        }
    }
}

impl fmt::Display for TraceOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// One allocation event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationTrace {
    pub op: TraceOp,
    /// User pointer (0 when the operation produced none)
    pub ptr: usize,
    pub size: usize,
    /// Bytes in use in the charged record after the event
    pub total_bytes_in_use: isize,
    pub live_block_count: isize,
    pub file: String,
    pub line: u32,
    pub thread_id: u64,
    /// Wall-clock nanoseconds since the Unix epoch
    pub timestamp_ns: u64,
}

impl AllocationTrace {
    pub(crate) fn new(
        op: TraceOp,
        ptr: usize,
        size: usize,
        total_bytes_in_use: isize,
        live_block_count: isize,
        site: &Location<'_>,
        thread_id: u64,
    ) -> Self {
        Self {
            op,
            ptr,
            size,
            total_bytes_in_use,
            live_block_count,
            file: site.file().to_string(),
            line: site.line(),
            thread_id,
            timestamp_ns: now_ns(),
        }
    }
}

impl fmt::Display for AllocationTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MEM: {:#x} {:5} {:<14} {:7} {:4} --- {}:{}",
            self.ptr,
            self.size,
            self.op,
            self.total_bytes_in_use,
            self.live_block_count,
            self.file,
            self.line
        )
    }
}

fn now_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

/// Destination for allocation trace records
pub trait TraceSink: Send + Sync {
    fn record(&self, trace: &AllocationTrace);
}

/// Emits each record as a `tracing` debug event on target `sysport::memory`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl TraceSink for TracingSink {
    fn record(&self, trace: &AllocationTrace) {
        debug!(
            target: "sysport::memory",
            op = trace.op.as_str(),
            ptr = format_args!("{:#x}", trace.ptr),
            size = trace.size,
            total = trace.total_bytes_in_use,
            blocks = trace.live_block_count,
            file = %trace.file,
            line = trace.line,
            thread_id = trace.thread_id,
            timestamp_ns = trace.timestamp_ns,
            "{}",
            trace
        );
    }
}

/// Keeps every record in memory, for tests and post-mortem inspection
#[derive(Default)]
pub struct RecordingSink {
    records: Mutex<Vec<AllocationTrace>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<AllocationTrace> {
        self.records.lock().clone()
    }

    pub fn ops(&self) -> Vec<TraceOp> {
        self.records.lock().iter().map(|r| r.op).collect()
    }

    pub fn clear(&self) {
        self.records.lock().clear();
    }
}

impl TraceSink for RecordingSink {
    fn record(&self, trace: &AllocationTrace) {
        self.records.lock().push(trace.clone());
    }
}
