/*!
 * Core Module
 * Portable primitives: atomics, synchronization, thread identity
 */

pub mod atomic;
pub mod config;
pub mod context;
pub mod errors;
pub mod limits;
pub mod sync;
pub mod thread;

// Re-export for convenience
pub use atomic::{Counter, WideCounter};
pub use config::{AllocatorConfig, Config, IdentityConfig};
pub use context::Context;
pub use errors::*;
pub use thread::{current_thread_id, ThreadRegistry, ThreadRole};
