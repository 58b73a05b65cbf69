/*!
 * Reentrant Mutex
 *
 * Exclusive lock with explicit lock/unlock and owner tracking. The owning
 * thread may re-acquire; a depth counter releases the raw lock only when
 * the outermost unlock runs. Unlocking from a thread that does not own the
 * lock is a defect and is always checked, since releasing a raw lock from
 * a non-owner is unsound.
 */

use crate::core::types::current_thread_id;
use parking_lot::lock_api::RawMutex as _;
use parking_lot::RawMutex;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

struct MutexInner {
    raw: RawMutex,
    /// Id of the thread holding the lock; zero when free. Only the holder
    /// stores a nonzero value, so a Relaxed self-compare is sufficient for
    /// the reentrant fast path.
    owner: AtomicU64,
    depth: AtomicU32,
}

/// Exclusive owner of one native exclusion primitive.
pub struct Mutex {
    inner: Box<MutexInner>,
}

impl Mutex {
    pub fn new() -> Mutex {
        Mutex {
            inner: Box::new(MutexInner {
                raw: RawMutex::INIT,
                owner: AtomicU64::new(0),
                depth: AtomicU32::new(0),
            }),
        }
    }

    /// Acquire the lock, blocking until available. Re-acquiring from the
    /// owning thread succeeds immediately and deepens ownership.
    pub fn lock(&self) {
        let tid = current_thread_id();
        if self.inner.owner.load(Ordering::Relaxed) == tid {
            self.inner.depth.fetch_add(1, Ordering::Relaxed);
            return;
        }
        self.inner.raw.lock();
        self.inner.owner.store(tid, Ordering::Relaxed);
        self.inner.depth.store(1, Ordering::Relaxed);
    }

    /// Non-blocking acquire. Returns whether the lock was taken (or
    /// deepened, for the owning thread).
    pub fn try_lock(&self) -> bool {
        let tid = current_thread_id();
        if self.inner.owner.load(Ordering::Relaxed) == tid {
            self.inner.depth.fetch_add(1, Ordering::Relaxed);
            return true;
        }
        if self.inner.raw.try_lock() {
            self.inner.owner.store(tid, Ordering::Relaxed);
            self.inner.depth.store(1, Ordering::Relaxed);
            true
        } else {
            false
        }
    }

    /// Release one level of ownership; the lock opens to other threads when
    /// the depth reaches zero.
    pub fn unlock(&self) {
        let tid = current_thread_id();
        assert_eq!(
            self.inner.owner.load(Ordering::Relaxed),
            tid,
            "mutex unlocked by a thread that does not own it"
        );
        if self.inner.depth.fetch_sub(1, Ordering::Relaxed) == 1 {
            self.inner.owner.store(0, Ordering::Relaxed);
            unsafe { self.inner.raw.unlock() };
        }
    }
}

impl Default for Mutex {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_reentrant_lock_unlock() {
        let mutex = Mutex::new();
        mutex.lock();
        mutex.lock();
        mutex.unlock();
        mutex.unlock();
        assert!(mutex.try_lock());
        mutex.unlock();
    }

    #[test]
    fn test_try_lock_fails_under_contention() {
        let mutex = Arc::new(Mutex::new());
        mutex.lock();

        let contender = mutex.clone();
        let acquired = thread::spawn(move || contender.try_lock()).join().unwrap();
        assert!(!acquired);

        mutex.unlock();
    }

    #[test]
    #[should_panic(expected = "does not own it")]
    fn test_unlock_from_wrong_thread_is_a_defect() {
        let mutex = Arc::new(Mutex::new());
        mutex.lock();

        let intruder = mutex.clone();
        // Re-panic the worker's failure on this thread for should_panic.
        let result = thread::spawn(move || intruder.unlock()).join();
        mutex.unlock();
        if let Err(panic) = result {
            std::panic::resume_unwind(panic);
        }
    }
}
