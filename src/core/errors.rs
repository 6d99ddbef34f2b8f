/*!
 * Error Types
 * Centralized error handling with thiserror and miette
 */

use crate::core::limits::{EBUSY, EINVAL, ENOMEM, EPERM};
use miette::Diagnostic;
use thiserror::Error;

/// Result type for primitive lifecycle and lock operations
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors reported by the synchronization primitives
///
/// Each variant maps to a non-zero errno-style code via [`SyncError::code`]
/// for callers that speak the C-shaped `int` return convention.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Diagnostic)]
pub enum SyncError {
    #[error("{0} is already initialized")]
    #[diagnostic(
        code(sync::already_initialized),
        help("Destroy the primitive before initializing it again.")
    )]
    AlreadyInitialized(&'static str),

    #[error("{0} is busy")]
    #[diagnostic(
        code(sync::busy),
        help("The primitive is locked or has waiters. Release it before destroying.")
    )]
    Busy(&'static str),

    #[error("{0} is not initialized")]
    #[diagnostic(
        code(sync::not_initialized),
        help("Call init() before use; destroyed primitives must be re-initialized.")
    )]
    NotInitialized(&'static str),

    #[error("{0} is not held by the calling thread")]
    #[diagnostic(code(sync::not_owner))]
    NotOwner(&'static str),

    #[error("Resources exhausted while creating {0}")]
    #[diagnostic(
        code(sync::resource_exhausted),
        help("The system could not provide the backing objects. Free resources and retry.")
    )]
    ResourceExhausted(&'static str),
}

impl SyncError {
    /// Errno-style code for this error (never zero)
    #[inline]
    pub const fn code(&self) -> i32 {
        match self {
            SyncError::AlreadyInitialized(_) | SyncError::Busy(_) => EBUSY,
            SyncError::NotInitialized(_) => EINVAL,
            SyncError::NotOwner(_) => EPERM,
            SyncError::ResourceExhausted(_) => ENOMEM,
        }
    }
}

/// Collapse a lifecycle result into the `0` / non-zero return convention
#[inline]
pub fn status_code(result: SyncResult<()>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(e) => e.code(),
    }
}
