/*!
 * Thread Records
 *
 * Per-thread identity state kept in thread-local storage.
 */

use crate::core::atomic::Counter;
use crate::core::limits::THREAD_SCRATCH_SIZE;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::warn;

/// Opaque per-thread value supplied at worker registration
pub type UserData = Arc<dyn Any + Send + Sync>;

/// Who owns a thread
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreadRole {
    /// No record exists yet
    Unset,
    /// Created and registered by the library's owner
    Worker,
    /// Seen for the first time when it asked for its identity
    Foreign,
}

/// Live counts shared between a registry and the records it issued
///
/// Records may outlive their registry (thread exit after the registry is
/// dropped), so the counts live behind an `Arc`.
pub(crate) struct RegistryCounters {
    pub issued: Counter,
    pub workers: Counter,
    pub foreign: Counter,
    pub foreign_limit: usize,
    limit_warned: AtomicBool,
}

impl RegistryCounters {
    pub fn new(foreign_limit: usize) -> Self {
        Self {
            issued: Counter::new(0),
            workers: Counter::new(0),
            foreign: Counter::new(0),
            foreign_limit,
            limit_warned: AtomicBool::new(false),
        }
    }

    pub fn next_index(&self) -> u64 {
        self.issued.increment() as u64
    }

    pub fn enter(&self, role: ThreadRole) {
        match role {
            ThreadRole::Worker => {
                self.workers.increment();
            }
            ThreadRole::Foreign => {
                let live = self.foreign.increment();
                if live as usize > self.foreign_limit
                    && !self.limit_warned.swap(true, Ordering::Relaxed)
                {
                    warn!(
                        live,
                        limit = self.foreign_limit,
                        "Foreign thread registrations exceed configured limit"
                    );
                }
            }
            ThreadRole::Unset => {}
        }
    }

    pub fn exit(&self, role: ThreadRole) {
        match role {
            ThreadRole::Worker => {
                self.workers.decrement();
            }
            ThreadRole::Foreign => {
                self.foreign.decrement();
            }
            ThreadRole::Unset => {}
        }
    }
}

/// Identity record of one thread within one registry
pub(crate) struct ThreadRecord {
    pub registry: u64,
    pub role: ThreadRole,
    pub index: u64,
    pub user_data: Option<UserData>,
    pub scratch: [u8; THREAD_SCRATCH_SIZE],
    counters: Arc<RegistryCounters>,
}

impl ThreadRecord {
    pub fn new(
        registry: u64,
        role: ThreadRole,
        user_data: Option<UserData>,
        counters: Arc<RegistryCounters>,
    ) -> Self {
        let index = counters.next_index();
        counters.enter(role);
        Self {
            registry,
            role,
            index,
            user_data,
            scratch: [0; THREAD_SCRATCH_SIZE],
            counters,
        }
    }

    /// Change role, keeping the index
    pub fn promote(&mut self, role: ThreadRole) {
        if self.role != role {
            self.counters.exit(self.role);
            self.counters.enter(role);
            self.role = role;
        }
    }
}

impl Drop for ThreadRecord {
    fn drop(&mut self) {
        self.counters.exit(self.role);
    }
}
