/*!
 * Waiter Chain Condition Variable
 *
 * Condition variable for platforms without one, built from a FIFO chain of
 * per-thread wait handles behind an internal lock.
 *
 * Protocol:
 * - wait: enqueue own handle, release the caller's mutex, block on the handle
 * - signal: dequeue the head and set its handle
 * - broadcast: dequeue the whole chain and set every handle
 * - timeout: the waiter dequeues itself; if a signaller already dequeued it,
 *   the wake-up is already in flight and the wait counts as signaled
 *
 * Handles are set while the chain lock is held, so a waiter that fails to
 * find itself in the chain can consume its pending wake-up without blocking.
 */

use super::event::Event;
use crate::core::errors::{SyncError, SyncResult};
use crate::core::limits::INITIAL_WAITER_CAPACITY;
use crate::core::sync::traits::{RawCondvar, WaitOutcome};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

thread_local! {
    /// One wait handle per thread; a thread waits on at most one condvar at a time
    static WAIT_HANDLE: Arc<Event> = Arc::new(Event::new(false));
}

pub struct WaiterChain {
    chain: Mutex<VecDeque<Arc<Event>>>,
}

impl RawCondvar for WaiterChain {
    fn new() -> Self {
        Self {
            chain: Mutex::new(VecDeque::new()),
        }
    }

    fn prepare(&self) -> SyncResult<()> {
        self.chain
            .lock()
            .try_reserve(INITIAL_WAITER_CAPACITY)
            .map_err(|_| SyncError::ResourceExhausted("condition variable"))
    }

    fn retire(&self) {
        let mut chain = self.chain.lock();
        chain.clear();
        chain.shrink_to_fit();
    }

    fn wait<F: FnOnce()>(&self, release: F, deadline: Option<Instant>) -> SyncResult<WaitOutcome> {
        let handle = WAIT_HANDLE
            .try_with(Arc::clone)
            .map_err(|_| SyncError::ResourceExhausted("condition variable wait handle"))?;

        {
            let mut chain = self.chain.lock();
            chain
                .try_reserve(1)
                .map_err(|_| SyncError::ResourceExhausted("condition variable"))?;
            chain.push_back(handle.clone());
        }

        release();

        if handle.wait(deadline) {
            return Ok(WaitOutcome::Signaled);
        }

        let mut chain = self.chain.lock();
        match chain.iter().position(|w| Arc::ptr_eq(w, &handle)) {
            Some(pos) => {
                chain.remove(pos);
                Ok(WaitOutcome::TimedOut)
            }
            None => {
                drop(chain);
                // Dequeued by a signaller that has already set our handle
                handle.wait(None);
                Ok(WaitOutcome::Signaled)
            }
        }
    }

    fn notify_one(&self) -> usize {
        let mut chain = self.chain.lock();
        match chain.pop_front() {
            Some(waiter) => {
                waiter.set();
                1
            }
            None => 0,
        }
    }

    fn notify_all(&self) -> usize {
        let mut chain = self.chain.lock();
        let woken = chain.len();
        for waiter in chain.drain(..) {
            waiter.set();
        }
        woken
    }

    fn waiters(&self) -> usize {
        self.chain.lock().len()
    }
}
