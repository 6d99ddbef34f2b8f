/*!
 * Thread Identity
 *
 * A stable 64-bit identity for the calling thread, usable in logs and as a
 * lock-owner tag.
 *
 * # Resolution
 *
 * - If the native thread handle fits in 64 bits, its bits are the identity
 * - Otherwise the thread's index in the global [`ThreadRegistry`] is used,
 *   registering the thread as foreign on first use
 *
 * Identities are distinct among simultaneously live threads and stable for
 * a thread's lifetime. Resolution never blocks on other threads and never
 * fails. It does not touch the process [`Context`](crate::Context), so the
 * first resolution in a process cannot wait on a context under construction.
 */

mod record;
mod registry;

pub use record::{ThreadRole, UserData};
pub use registry::{RegistryStats, ThreadRegistry};

/// Identity of the calling thread
#[inline]
pub fn current_thread_id() -> u64 {
    #[cfg(unix)]
    {
        if native::HANDLE_FITS {
            return native::handle_bits();
        }
    }
    registered_thread_id()
}

/// Identity from the global registry, bypassing the native handle
#[inline]
pub fn registered_thread_id() -> u64 {
    ThreadRegistry::global().resolve()
}

/// Mark the calling thread as library-owned in the global registry
pub fn register_worker(user_data: Option<UserData>) -> u64 {
    ThreadRegistry::global().register_worker(user_data)
}

#[cfg(unix)]
mod native {
    use std::mem::size_of;

    pub const HANDLE_FITS: bool = size_of::<libc::pthread_t>() <= size_of::<u64>();

    /// Bits of `pthread_self()`, zero-extended to 64 bits
    #[inline]
    pub fn handle_bits() -> u64 {
        // SAFETY: pthread_self has no preconditions
        let handle = unsafe { libc::pthread_self() };
        let mut bytes = [0u8; 8];
        let len = size_of::<libc::pthread_t>().min(bytes.len());
        // SAFETY: `len` never exceeds either buffer
        unsafe {
            std::ptr::copy_nonoverlapping(
                &handle as *const libc::pthread_t as *const u8,
                bytes.as_mut_ptr(),
                len,
            );
        }
        u64::from_ne_bytes(bytes)
    }
}
