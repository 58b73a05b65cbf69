/*!
 * Core Type Aliases
 * Entry-point signatures and identity helpers shared across primitives
 */

use std::ffi::c_void;
use std::sync::atomic::{AtomicU64, Ordering};

/// Entry point executed once by a spawned thread; its return value becomes
/// the thread's exit code.
pub type ThreadEntryPoint = fn(*mut c_void) -> i32;

/// Entry point executed once by a spawned fiber. Returning resumes the
/// context that last switched into the fiber.
pub type FiberEntryPoint = fn(*mut c_void);

/// CPU affinity bitmask covering logical cores 0..64.
pub type AffinityMask = u64;

/// Opaque user-data pointer made movable into a spawn closure. The pointee's
/// thread-safety is the caller's contract, exactly as with the raw entry point.
pub(crate) struct SendPtr(pub *mut c_void);

unsafe impl Send for SendPtr {}

static NEXT_THREAD_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static THREAD_ID: u64 = NEXT_THREAD_ID.fetch_add(1, Ordering::Relaxed);
}

/// Cheap process-unique id for the calling thread. Never zero, so zero can
/// mean "no owner" in lock state.
pub(crate) fn current_thread_id() -> u64 {
    THREAD_ID.with(|id| *id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_thread_id_nonzero_and_stable() {
        let first = current_thread_id();
        assert_ne!(first, 0);
        assert_eq!(first, current_thread_id());
    }

    #[test]
    fn test_thread_id_distinct_across_threads() {
        let mine = current_thread_id();
        let other = thread::spawn(current_thread_id).join().unwrap();
        assert_ne!(mine, other);
    }
}
