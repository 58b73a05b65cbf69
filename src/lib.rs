/*!
 * Native Concurrency Primitives
 *
 * Thin exclusive-ownership wrappers over operating-system concurrency
 * resources: kernel threads, cooperative fibers, counting semaphores,
 * reentrant mutexes, read-write locks, and thread/fiber-local storage.
 *
 * Each wrapper owns exactly one native resource, transfers only by move,
 * and releases exactly once. Internal state is heap-pinned so a wrapper
 * move never relocates memory a blocked waiter or a saved execution
 * context points at.
 */

pub mod core;
pub mod diag;
pub mod fiber;
pub mod storage;
pub mod sync;
pub mod thread;

// Re-exports
pub use crate::core::errors::{
    FiberError, FiberResult, StorageError, StorageResult, SyncError, SyncResult, ThreadError,
    ThreadResult,
};
pub use crate::core::types::{AffinityMask, FiberEntryPoint, ThreadEntryPoint};
pub use crate::diag::Instrumentation;
pub use crate::fiber::{Fiber, FiberRef};
pub use crate::storage::{Fls, Tls};
pub use crate::sync::{Mutex, RwLock, Semaphore};
pub use crate::thread::{logical_core_count, Thread};
