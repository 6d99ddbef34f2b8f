/*!
 * Auto-Reset Event
 *
 * A binary wait handle: `set` releases exactly one successful `wait`, after
 * which the event is clear again. Used both as the per-thread wait handle of
 * the emulated condvar and, created in the set state, as the emulated
 * mutex's binary semaphore.
 */

use parking_lot::{Condvar, Mutex};
use std::time::Instant;

pub struct Event {
    signaled: Mutex<bool>,
    cond: Condvar,
}

impl Event {
    pub fn new(initially_set: bool) -> Self {
        Self {
            signaled: Mutex::new(initially_set),
            cond: Condvar::new(),
        }
    }

    /// Set the event, releasing one waiter
    pub fn set(&self) {
        let mut signaled = self.signaled.lock();
        *signaled = true;
        self.cond.notify_one();
    }

    /// Wait for the event and consume it
    ///
    /// Returns false if `deadline` passed with the event still clear.
    pub fn wait(&self, deadline: Option<Instant>) -> bool {
        let mut signaled = self.signaled.lock();
        while !*signaled {
            match deadline {
                None => self.cond.wait(&mut signaled),
                Some(deadline) => {
                    if self.cond.wait_until(&mut signaled, deadline).timed_out() {
                        break;
                    }
                }
            }
        }
        std::mem::replace(&mut *signaled, false)
    }

    /// Consume the event if set, without blocking
    pub fn try_wait(&self) -> bool {
        std::mem::replace(&mut *self.signaled.lock(), false)
    }

    pub fn is_set(&self) -> bool {
        *self.signaled.lock()
    }
}
