/*!
 * Error Types
 * Per-domain error enums with thiserror and miette diagnostics
 */

use miette::Diagnostic;
use thiserror::Error;

/// Thread-related errors
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum ThreadError {
    #[error("Failed to spawn thread: {0}")]
    #[diagnostic(
        code(thread::spawn_failed),
        help("The OS could not allocate a new thread. Check resource limits and stack size.")
    )]
    SpawnFailed(String),
}

/// Fiber-related errors
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum FiberError {
    #[error("Failed to map fiber stack: {0}")]
    #[diagnostic(
        code(fiber::stack_allocation_failed),
        help("The OS could not map stack memory. Check address space and mapping limits.")
    )]
    StackAllocationFailed(String),

    #[error("Failed to initialize fiber context: {0}")]
    #[diagnostic(
        code(fiber::context_init_failed),
        help("The platform rejected the execution-context setup call.")
    )]
    ContextInitFailed(String),

    #[error("Calling thread already runs a fiber")]
    #[diagnostic(
        code(fiber::already_converted),
        help("A thread can be converted to a fiber only once. Reuse the existing origin fiber.")
    )]
    AlreadyConverted,
}

/// Synchronization primitive errors
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum SyncError {
    #[error("Initial count {initial} exceeds maximum {maximum}")]
    #[diagnostic(
        code(sync::count_exceeds_maximum),
        help("A semaphore's initial count must not exceed its maximum.")
    )]
    CountExceedsMaximum { initial: u32, maximum: u32 },
}

/// Thread/fiber-local storage errors
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum StorageError {
    #[error("Failed to allocate storage key: {0}")]
    #[diagnostic(
        code(storage::key_allocation_failed),
        help("The process ran out of native storage keys. Release unused slots.")
    )]
    KeyAllocationFailed(String),

    #[error("Fiber-local slot space exhausted ({limit} slots)")]
    #[diagnostic(
        code(storage::slots_exhausted),
        help("Release unused fiber-local slots before allocating more.")
    )]
    SlotsExhausted { limit: usize },
}

/// Result type for thread operations
pub type ThreadResult<T> = std::result::Result<T, ThreadError>;

/// Result type for fiber operations
pub type FiberResult<T> = std::result::Result<T, FiberError>;

/// Result type for synchronization primitives
pub type SyncResult<T> = std::result::Result<T, SyncError>;

/// Result type for storage slots
pub type StorageResult<T> = std::result::Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thread_error_display() {
        let error = ThreadError::SpawnFailed("resource temporarily unavailable".into());
        assert_eq!(
            error.to_string(),
            "Failed to spawn thread: resource temporarily unavailable"
        );
    }

    #[test]
    fn test_sync_error_display() {
        let error = SyncError::CountExceedsMaximum {
            initial: 5,
            maximum: 3,
        };
        assert_eq!(error.to_string(), "Initial count 5 exceeds maximum 3");
    }

    #[test]
    fn test_fiber_error_equality() {
        assert_eq!(FiberError::AlreadyConverted, FiberError::AlreadyConverted);
        assert_ne!(
            FiberError::AlreadyConverted,
            FiberError::ContextInitFailed("enosys".into())
        );
    }
}
