/*!
 * Process Context
 *
 * Owns the state shared by a process: the thread registry and the
 * instrumented allocator with its default statistics record. Create one
 * explicitly with [`Context::new`], or use the lazily initialized
 * process-wide instance from [`Context::global`].
 *
 * The process-wide context borrows [`ThreadRegistry::global`] instead of
 * owning a registry, so resolving a thread identity never waits on the
 * context being built. If identities were resolved before the context was
 * installed, the registry keeps the settings it was created with.
 *
 * The atomic counters' fallback lock is not part of the context; it is a
 * dedicated static owned by the counter facility.
 */

use crate::core::config::Config;
use crate::core::errors::{SyncError, SyncResult};
use crate::core::sync;
use crate::core::thread::ThreadRegistry;
use crate::memory::{Allocator, MemoryStats, MemoryStatsSnapshot, StatsHandle};
use std::sync::OnceLock;
use tracing::info;

static GLOBAL: OnceLock<Context> = OnceLock::new();

#[derive(Debug)]
pub struct Context {
    config: Config,
    /// `None` for the process-wide context, which uses the global registry
    threads: Option<ThreadRegistry>,
    allocator: Allocator,
}

impl Context {
    pub fn new(config: Config) -> Self {
        let threads = ThreadRegistry::new(&config.identity);
        Self::assemble(config, Some(threads))
    }

    fn process_wide(config: Config) -> Self {
        ThreadRegistry::global_or_init(|| config.identity.clone());
        Self::assemble(config, None)
    }

    fn assemble(config: Config, threads: Option<ThreadRegistry>) -> Self {
        info!(
            sync_backend = sync::backend_name(),
            trace_allocations = config.allocator.trace,
            foreign_thread_limit = config.identity.foreign_thread_limit,
            process_wide = threads.is_none(),
            "Creating context"
        );
        Self {
            threads,
            allocator: Allocator::new(&config.allocator),
            config,
        }
    }

    /// Install `config` as the process-wide context
    ///
    /// Fails with `AlreadyInitialized` once the global context exists,
    /// whether installed or created lazily.
    pub fn install(config: Config) -> SyncResult<&'static Context> {
        let mut candidate = Some(config);
        let ctx =
            GLOBAL.get_or_init(|| Context::process_wide(candidate.take().unwrap_or_default()));
        if candidate.is_some() {
            return Err(SyncError::AlreadyInitialized("global context"));
        }
        Ok(ctx)
    }

    /// Process-wide context, created from the environment on first use
    pub fn global() -> &'static Context {
        GLOBAL.get_or_init(|| Context::process_wide(Config::from_env()))
    }

    /// True once the process-wide context exists
    pub fn is_initialized() -> bool {
        GLOBAL.get().is_some()
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[inline]
    pub fn threads(&self) -> &ThreadRegistry {
        self.threads.as_ref().unwrap_or_else(|| ThreadRegistry::global())
    }

    #[inline]
    pub fn allocator(&self) -> &Allocator {
        &self.allocator
    }

    /// Default statistics record
    #[inline]
    pub fn stats(&self) -> &StatsHandle {
        self.allocator.stats()
    }

    /// A new record for scoping a subsystem's allocations
    pub fn new_stats_record(&self) -> StatsHandle {
        MemoryStats::shared()
    }

    pub fn memory_snapshot(&self) -> MemoryStatsSnapshot {
        self.allocator.snapshot()
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new(Config::default())
    }
}
