/*!
 * Counting Semaphore
 *
 * Counter bounded by `[0, maximum]` with blocking wait, timeout, and
 * bounded signal. Construction with a name aliases one process-wide
 * counter per name, matching named kernel objects: naming is identity
 * sharing, not labeling, and two semaphores created with the same name
 * share count and maximum.
 */

use crate::core::errors::{SyncError, SyncResult};
use ahash::RandomState;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::{Condvar, Mutex};
use std::sync::{Arc, OnceLock, Weak};
use std::time::{Duration, Instant};

struct SemInner {
    count: Mutex<u32>,
    available: Condvar,
    maximum: u32,
    name: Option<String>,
}

impl SemInner {
    fn new(initial: u32, maximum: u32, name: Option<String>) -> SemInner {
        SemInner {
            count: Mutex::new(initial),
            available: Condvar::new(),
            maximum,
            name,
        }
    }
}

/// Live named counters. Entries are weak so a name frees once every handle
/// to it is gone, as with named kernel objects.
fn registry() -> &'static DashMap<String, Weak<SemInner>, RandomState> {
    static NAMED: OnceLock<DashMap<String, Weak<SemInner>, RandomState>> = OnceLock::new();
    NAMED.get_or_init(|| DashMap::with_hasher(RandomState::new()))
}

/// Owner of one counting semaphore handle. Named handles may share their
/// underlying counter.
pub struct Semaphore {
    inner: Arc<SemInner>,
}

impl Semaphore {
    /// Create a semaphore with `initial` permits bounded by `maximum`.
    ///
    /// A non-empty `name` aliases the process-wide counter of that name,
    /// creating it on first use; the first creator's `initial` and
    /// `maximum` win for every alias.
    pub fn new(initial: u32, maximum: u32, name: Option<&str>) -> SyncResult<Semaphore> {
        if initial > maximum {
            return Err(SyncError::CountExceedsMaximum { initial, maximum });
        }

        let inner = match name {
            Some(name) if !name.is_empty() => match registry().entry(name.to_owned()) {
                Entry::Occupied(mut entry) => match entry.get().upgrade() {
                    Some(existing) => existing,
                    None => {
                        let fresh =
                            Arc::new(SemInner::new(initial, maximum, Some(name.to_owned())));
                        entry.insert(Arc::downgrade(&fresh));
                        fresh
                    }
                },
                Entry::Vacant(entry) => {
                    let fresh = Arc::new(SemInner::new(initial, maximum, Some(name.to_owned())));
                    entry.insert(Arc::downgrade(&fresh));
                    fresh
                }
            },
            _ => Arc::new(SemInner::new(initial, maximum, None)),
        };

        Ok(Semaphore { inner })
    }

    /// Decrement the count, blocking while it is zero.
    ///
    /// `None` blocks indefinitely; a zero timeout polls. Returns whether a
    /// permit was acquired. Timing out is normal control flow, not an
    /// error.
    pub fn wait(&self, timeout: Option<Duration>) -> bool {
        let mut count = self.inner.count.lock();
        match timeout {
            None => {
                while *count == 0 {
                    self.inner.available.wait(&mut count);
                }
            }
            Some(timeout) if timeout.is_zero() => {
                if *count == 0 {
                    return false;
                }
            }
            Some(timeout) => {
                let deadline = Instant::now() + timeout;
                while *count == 0 {
                    if self
                        .inner
                        .available
                        .wait_until(&mut count, deadline)
                        .timed_out()
                    {
                        if *count == 0 {
                            return false;
                        }
                        break;
                    }
                }
            }
        }
        *count -= 1;
        true
    }

    /// Increment the count by `count` permits.
    ///
    /// Fails without effect if the increment would exceed the maximum or
    /// `count` is zero.
    pub fn signal(&self, count: u32) -> bool {
        if count == 0 {
            return false;
        }
        let mut current = self.inner.count.lock();
        if self.inner.maximum - *current < count {
            return false;
        }
        *current += count;
        drop(current);

        if count == 1 {
            self.inner.available.notify_one();
        } else {
            self.inner.available.notify_all();
        }
        true
    }
}

impl Drop for Semaphore {
    fn drop(&mut self) {
        // Last handle to a named counter retires its name.
        if let Some(name) = &self.inner.name {
            if Arc::strong_count(&self.inner) == 1 {
                registry().remove_if(name, |_, weak| weak.upgrade().is_none());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_exceeding_maximum_rejected() {
        assert!(matches!(
            Semaphore::new(4, 3, None),
            Err(SyncError::CountExceedsMaximum {
                initial: 4,
                maximum: 3
            })
        ));
    }

    #[test]
    fn test_signal_bounded_by_maximum() {
        let semaphore = Semaphore::new(1, 2, None).unwrap();
        assert!(semaphore.signal(1));
        assert!(!semaphore.signal(1));
        assert!(!semaphore.signal(0));
    }

    #[test]
    fn test_poll_wait_zero_timeout() {
        let semaphore = Semaphore::new(1, 1, None).unwrap();
        assert!(semaphore.wait(Some(Duration::ZERO)));
        assert!(!semaphore.wait(Some(Duration::ZERO)));
    }

    #[test]
    fn test_named_aliasing_shares_counter() {
        let first = Semaphore::new(0, 8, Some("unit-shared-counter")).unwrap();
        let second = Semaphore::new(5, 5, Some("unit-shared-counter")).unwrap();

        // The first creator's bounds win; the alias sees its permits.
        assert!(!second.wait(Some(Duration::ZERO)));
        assert!(first.signal(1));
        assert!(second.wait(Some(Duration::ZERO)));
    }

    #[test]
    fn test_name_retired_with_last_handle() {
        {
            let held = Semaphore::new(0, 1, Some("unit-retired-name")).unwrap();
            assert!(held.signal(1));
        }
        // The name is free again, so fresh bounds apply.
        let reborn = Semaphore::new(0, 1, Some("unit-retired-name")).unwrap();
        assert!(!reborn.wait(Some(Duration::ZERO)));
    }

    #[test]
    fn test_unnamed_semaphores_distinct() {
        let left = Semaphore::new(1, 1, None).unwrap();
        let right = Semaphore::new(0, 1, None).unwrap();
        assert!(left.wait(Some(Duration::ZERO)));
        assert!(!right.wait(Some(Duration::ZERO)));
    }
}
