/*!
 * Read-Write Lock
 *
 * Shared/exclusive lock with explicit begin/end pairs. No reentrancy and
 * no read-to-write upgrade; an upgrade attempt can deadlock, matching the
 * underlying primitive. Mismatched end calls are always checked, since a
 * raw release without a matching hold is unsound. Diagnostics builds also
 * verify at destruction that the lock is free.
 */

use parking_lot::lock_api::RawRwLock as _;
use parking_lot::RawRwLock;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

struct RwInner {
    raw: RawRwLock,
    readers: AtomicUsize,
    writer: AtomicBool,
}

/// Exclusive owner of one native shared/exclusive primitive.
pub struct RwLock {
    inner: Box<RwInner>,
}

impl RwLock {
    pub fn new() -> RwLock {
        RwLock {
            inner: Box::new(RwInner {
                raw: RawRwLock::INIT,
                readers: AtomicUsize::new(0),
                writer: AtomicBool::new(false),
            }),
        }
    }

    /// Acquire shared access; any number of readers may hold it at once.
    pub fn begin_read(&self) {
        self.inner.raw.lock_shared();
        self.inner.readers.fetch_add(1, Ordering::Relaxed);
    }

    pub fn end_read(&self) {
        let previous = self.inner.readers.fetch_sub(1, Ordering::Relaxed);
        assert!(previous > 0, "end_read without a matching begin_read");
        unsafe { self.inner.raw.unlock_shared() };
    }

    /// Acquire exclusive access; blocks until no reader or writer holds it.
    pub fn begin_write(&self) {
        self.inner.raw.lock_exclusive();
        self.inner.writer.store(true, Ordering::Relaxed);
    }

    pub fn end_write(&self) {
        assert!(
            self.inner.writer.swap(false, Ordering::Relaxed),
            "end_write without a matching begin_write"
        );
        unsafe { self.inner.raw.unlock_exclusive() };
    }
}

impl Default for RwLock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "diagnostics")]
impl Drop for RwLock {
    fn drop(&mut self) {
        // A leaked hold surfaces immediately instead of corrupting whoever
        // maps this memory next.
        assert!(
            self.inner.raw.try_lock_exclusive(),
            "read-write lock destroyed while held"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_then_write_sequential() {
        let lock = RwLock::new();
        lock.begin_read();
        lock.begin_read();
        lock.end_read();
        lock.end_read();
        lock.begin_write();
        lock.end_write();
    }

    #[test]
    #[should_panic(expected = "without a matching begin_read")]
    fn test_unpaired_end_read_is_a_defect() {
        let lock = RwLock::new();
        lock.end_read();
    }

    #[test]
    #[should_panic(expected = "without a matching begin_write")]
    fn test_unpaired_end_write_is_a_defect() {
        let lock = RwLock::new();
        lock.end_write();
    }
}
