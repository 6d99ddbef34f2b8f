/*!
 * Primitive Lifecycle
 *
 * init / destroy state machine shared by every primitive, plus the owner
 * slot used to catch unlock-by-non-owner.
 *
 * Double init and destroy-while-busy are reported as errors. Use before init
 * or after destroy, and unlock by a non-owner, are caller bugs: they trip a
 * debug assertion and otherwise surface as an error code.
 */

use crate::core::errors::{SyncError, SyncResult};
use crate::core::thread::current_thread_id;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

const UNINIT: u8 = 0;
const READY: u8 = 1;
const DESTROYED: u8 = 2;

/// init / destroy state of one primitive
pub(crate) struct Lifecycle {
    state: AtomicU8,
    kind: &'static str,
}

impl Lifecycle {
    pub const fn new(kind: &'static str) -> Self {
        Self {
            state: AtomicU8::new(UNINIT),
            kind,
        }
    }

    /// Lifecycle of a primitive created already initialized
    pub const fn ready(kind: &'static str) -> Self {
        Self {
            state: AtomicU8::new(READY),
            kind,
        }
    }

    #[inline]
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// UNINIT or DESTROYED -> READY
    pub fn init(&self) -> SyncResult<()> {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            if current == READY {
                return Err(SyncError::AlreadyInitialized(self.kind));
            }
            match self
                .state
                .compare_exchange(current, READY, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return Ok(()),
                Err(seen) => current = seen,
            }
        }
    }

    /// Undo a successful `init` whose backing resources could not be obtained
    pub fn abort_init(&self) {
        self.state.store(UNINIT, Ordering::Release);
    }

    /// READY -> DESTROYED, refused while `busy`
    pub fn destroy(&self, busy: bool) -> SyncResult<()> {
        self.check()?;
        if busy {
            return Err(SyncError::Busy(self.kind));
        }
        match self
            .state
            .compare_exchange(READY, DESTROYED, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => Ok(()),
            Err(_) => Err(SyncError::NotInitialized(self.kind)),
        }
    }

    #[inline]
    pub fn is_ready(&self) -> bool {
        self.state.load(Ordering::Acquire) == READY
    }

    /// Verify the primitive may be used
    #[inline]
    pub fn check(&self) -> SyncResult<()> {
        let ready = self.is_ready();
        debug_assert!(ready, "{} used before init or after destroy", self.kind);
        if ready {
            Ok(())
        } else {
            Err(SyncError::NotInitialized(self.kind))
        }
    }
}

/// Thread identity of the current exclusive holder (0 = none)
pub(crate) struct Owner {
    thread: AtomicU64,
}

impl Owner {
    pub const fn new() -> Self {
        Self {
            thread: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn claim(&self) {
        self.thread.store(current_thread_id(), Ordering::Relaxed);
    }

    #[inline]
    pub fn clear(&self) {
        self.thread.store(0, Ordering::Relaxed);
    }

    /// Verify the calling thread holds the lock
    #[inline]
    pub fn check(&self, kind: &'static str) -> SyncResult<()> {
        let owned = self.thread.load(Ordering::Relaxed) == current_thread_id();
        debug_assert!(owned, "{kind} released by a thread that does not hold it");
        if owned {
            Ok(())
        } else {
            Err(SyncError::NotOwner(kind))
        }
    }
}
