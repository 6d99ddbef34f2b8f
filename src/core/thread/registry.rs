/*!
 * Thread Registry
 *
 * Assigns stable indices to threads and keeps their records in
 * thread-local storage. Library-owned threads register explicitly as
 * workers; any other thread is registered lazily as foreign the first time
 * it resolves its identity.
 *
 * # Lifecycle
 *
 * A record lives until its thread exits (thread-local destructor). Indices
 * are never reused within a registry. Resolution never blocks and never
 * fails: when thread-local storage is unavailable (thread teardown, or a
 * re-entrant call from inside a record accessor) a fresh index is issued
 * without caching it.
 *
 * The global registry does not live behind the process context. Threads
 * racing to create it each build a candidate and publish it with a single
 * compare-exchange; losers drop theirs and use the winner. Nobody waits for
 * another thread's initialization.
 */

use super::record::{RegistryCounters, ThreadRecord, ThreadRole, UserData};
use crate::core::config::{Config, IdentityConfig};
use crate::core::limits::THREAD_SCRATCH_SIZE;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fmt;
use std::ptr;
use std::sync::atomic::{AtomicPtr, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

static NEXT_REGISTRY_ID: AtomicU64 = AtomicU64::new(1);

/// Published once, never freed
static GLOBAL: AtomicPtr<ThreadRegistry> = AtomicPtr::new(ptr::null_mut());

thread_local! {
    /// One record per registry this thread has resolved against
    static RECORDS: RefCell<Vec<ThreadRecord>> = const { RefCell::new(Vec::new()) };
}

/// Point-in-time registry statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryStats {
    /// Indices handed out so far
    pub issued: u64,
    pub live_workers: usize,
    pub live_foreign: usize,
    pub foreign_limit: usize,
}

pub struct ThreadRegistry {
    id: u64,
    counters: Arc<RegistryCounters>,
}

impl ThreadRegistry {
    pub fn new(config: &IdentityConfig) -> Self {
        Self {
            id: NEXT_REGISTRY_ID.fetch_add(1, Ordering::Relaxed),
            counters: Arc::new(RegistryCounters::new(config.foreign_thread_limit)),
        }
    }

    /// Process-wide registry, configured from the environment on first use
    #[inline]
    pub fn global() -> &'static ThreadRegistry {
        Self::global_or_init(|| Config::from_env().identity)
    }

    /// Process-wide registry, built from `config` if it does not exist yet
    pub(crate) fn global_or_init(
        config: impl FnOnce() -> IdentityConfig,
    ) -> &'static ThreadRegistry {
        let current = GLOBAL.load(Ordering::Acquire);
        if !current.is_null() {
            // SAFETY: published pointers come from Box::into_raw and are never freed
            return unsafe { &*current };
        }

        let candidate = Box::into_raw(Box::new(ThreadRegistry::new(&config())));
        let published = GLOBAL.compare_exchange(
            ptr::null_mut(),
            candidate,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
        match published {
            // SAFETY: now published, so never freed
            Ok(_) => unsafe { &*candidate },
            Err(winner) => {
                // SAFETY: the candidate was never shared
                drop(unsafe { Box::from_raw(candidate) });
                // SAFETY: as above
                unsafe { &*winner }
            }
        }
    }

    /// Stable index of the calling thread, registering it as foreign if needed
    pub fn resolve(&self) -> u64 {
        if let Some(index) = self.with_record(|record| record.index) {
            return index;
        }
        self.register(ThreadRole::Foreign, None)
    }

    /// Mark the calling thread as library-owned and attach `user_data`
    ///
    /// A thread already known as foreign keeps its index.
    pub fn register_worker(&self, user_data: Option<UserData>) -> u64 {
        let mut pending = Some(user_data);
        let promoted = self.with_record_mut(|record| {
            record.promote(ThreadRole::Worker);
            record.user_data = pending.take().flatten();
            record.index
        });
        match promoted {
            Some(index) => index,
            None => self.register(ThreadRole::Worker, pending.flatten()),
        }
    }

    /// Role of the calling thread
    pub fn role(&self) -> ThreadRole {
        self.with_record(|record| record.role)
            .unwrap_or(ThreadRole::Unset)
    }

    /// User data attached at worker registration
    pub fn user_data(&self) -> Option<UserData> {
        self.with_record(|record| record.user_data.clone()).flatten()
    }

    /// Contents of the calling thread's scratch buffer (zeroed if unavailable)
    pub fn scratch(&self) -> [u8; THREAD_SCRATCH_SIZE] {
        self.with_record(|record| record.scratch)
            .unwrap_or([0; THREAD_SCRATCH_SIZE])
    }

    /// Overwrite the calling thread's scratch buffer
    ///
    /// Registers the thread as foreign if it has no record. Returns false when
    /// thread-local storage is unavailable.
    pub fn set_scratch(&self, bytes: [u8; THREAD_SCRATCH_SIZE]) -> bool {
        if self.with_record(|_| ()).is_none() {
            self.register(ThreadRole::Foreign, None);
        }
        self.with_record_mut(|record| record.scratch = bytes)
            .is_some()
    }

    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            issued: self.counters.issued.load() as u64,
            live_workers: self.counters.workers.load().max(0) as usize,
            live_foreign: self.counters.foreign.load().max(0) as usize,
            foreign_limit: self.counters.foreign_limit,
        }
    }

    fn register(&self, role: ThreadRole, user_data: Option<UserData>) -> u64 {
        let record = ThreadRecord::new(self.id, role, user_data, self.counters.clone());
        let index = record.index;

        let stored = RECORDS
            .try_with(|records| match records.try_borrow_mut() {
                Ok(mut records) => {
                    records.push(record);
                    true
                }
                Err(_) => false,
            })
            .unwrap_or(false);

        if stored {
            debug!(registry = self.id, index, ?role, "Registered thread");
        } else {
            trace!(registry = self.id, index, "Thread record not cached");
        }
        index
    }

    fn with_record<R>(&self, f: impl FnOnce(&ThreadRecord) -> R) -> Option<R> {
        RECORDS
            .try_with(|records| {
                let records = records.try_borrow().ok()?;
                records.iter().find(|r| r.registry == self.id).map(f)
            })
            .ok()
            .flatten()
    }

    fn with_record_mut<R>(&self, f: impl FnOnce(&mut ThreadRecord) -> R) -> Option<R> {
        RECORDS
            .try_with(|records| {
                let mut records = records.try_borrow_mut().ok()?;
                records.iter_mut().find(|r| r.registry == self.id).map(f)
            })
            .ok()
            .flatten()
    }
}

impl Drop for ThreadRegistry {
    fn drop(&mut self) {
        let id = self.id;
        let _ = RECORDS.try_with(|records| {
            if let Ok(mut records) = records.try_borrow_mut() {
                records.retain(|r| r.registry != id);
            }
        });
    }
}

impl fmt::Debug for ThreadRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadRegistry")
            .field("id", &self.id)
            .field("stats", &self.stats())
            .finish()
    }
}
