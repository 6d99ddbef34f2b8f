/*!
 * Allocator Accounting Properties
 *
 * After any sequence of successful operations, the statistics equal the
 * sum and count of the blocks still live, and the peak is the running
 * maximum of the total.
 */

use proptest::prelude::*;
use std::alloc::System;
use std::ptr::NonNull;
use sysport_core::memory::{Allocator, MemoryStats};

#[derive(Debug, Clone)]
enum Op {
    Allocate(usize),
    Zeroed(usize, usize),
    Reallocate(usize, usize),
    Free(usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0usize..512).prop_map(Op::Allocate),
        (0usize..16, 0usize..32).prop_map(|(c, s)| Op::Zeroed(c, s)),
        (any::<usize>(), 0usize..1024).prop_map(|(i, n)| Op::Reallocate(i, n)),
        any::<usize>().prop_map(Op::Free),
    ]
}

proptest! {
    #[test]
    fn prop_stats_match_live_blocks(ops in prop::collection::vec(op(), 1..64)) {
        let a = Allocator::with_backend(System, MemoryStats::shared());
        let mut live: Vec<(NonNull<u8>, usize)> = Vec::new();
        let mut peak = 0usize;

        for op in ops {
            match op {
                Op::Allocate(size) => {
                    let p = a.allocate(size).unwrap();
                    live.push((p, size));
                }
                Op::Zeroed(count, size) => {
                    let p = a.zeroed_allocate(count, size).unwrap();
                    live.push((p, count * size));
                }
                Op::Reallocate(i, new_size) if !live.is_empty() => {
                    let idx = i % live.len();
                    let (p, _) = live[idx];
                    match unsafe { a.reallocate(Some(p), new_size) } {
                        Some(q) => live[idx] = (q, new_size),
                        None => {
                            prop_assert_eq!(new_size, 0);
                            live.swap_remove(idx);
                        }
                    }
                }
                Op::Free(i) if !live.is_empty() => {
                    let (p, _) = live.swap_remove(i % live.len());
                    unsafe { a.free(Some(p)) };
                }
                _ => {}
            }

            let total: usize = live.iter().map(|(_, s)| s).sum();
            peak = peak.max(total);
            let snap = a.snapshot();
            prop_assert_eq!(snap.total_bytes_in_use, total);
            prop_assert_eq!(snap.live_block_count, live.len());
            prop_assert_eq!(snap.peak_bytes_in_use, peak);
        }

        for (p, _) in live.drain(..) {
            unsafe { a.free(Some(p)) };
        }
        prop_assert!(a.snapshot().is_empty());
    }
}
