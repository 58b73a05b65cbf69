/*!
 * Fiber-Local Storage Slot
 *
 * One opaque pointer per fiber, stored in the current fiber's table. A
 * thread that runs no fiber falls back to a per-thread table, matching
 * native fiber storage degrading to thread storage.
 */

use crate::core::errors::{StorageError, StorageResult};
use crate::fiber::with_context_slots;
use parking_lot::Mutex;
use std::ffi::c_void;
use std::ptr;

/// Ceiling on simultaneously live slots, matching a fixed native index
/// space.
const FLS_SLOT_LIMIT: usize = 128;

struct SlotAllocator {
    next_index: usize,
    next_generation: u64,
    free: Vec<usize>,
}

static SLOTS: Mutex<SlotAllocator> = Mutex::new(SlotAllocator {
    next_index: 0,
    next_generation: 1,
    free: Vec::new(),
});

/// Exclusive owner of one process-wide fiber-local slot index.
pub struct Fls {
    index: usize,
    /// Distinguishes this slot's values from a prior owner of the same
    /// recycled index, so a fresh slot reads null everywhere until written.
    generation: u64,
}

impl Fls {
    /// Allocate a slot index, recycling freed ones first.
    pub fn new() -> StorageResult<Fls> {
        let mut slots = SLOTS.lock();
        let index = match slots.free.pop() {
            Some(index) => index,
            None => {
                if slots.next_index == FLS_SLOT_LIMIT {
                    return Err(StorageError::SlotsExhausted {
                        limit: FLS_SLOT_LIMIT,
                    });
                }
                let index = slots.next_index;
                slots.next_index += 1;
                index
            }
        };
        let generation = slots.next_generation;
        slots.next_generation += 1;
        Ok(Fls { index, generation })
    }

    /// Store `value` for the calling execution context. Returns whether the
    /// store succeeded.
    pub fn set(&self, value: *mut c_void) -> bool {
        with_context_slots(|table| {
            if table.len() <= self.index {
                table.resize(self.index + 1, (0, ptr::null_mut()));
            }
            table[self.index] = (self.generation, value);
            true
        })
    }

    /// Value stored by the calling execution context, or null if it never
    /// wrote to this slot.
    pub fn get(&self) -> *mut c_void {
        with_context_slots(|table| match table.get(self.index) {
            Some(&(generation, value)) if generation == self.generation => value,
            _ => ptr::null_mut(),
        })
    }
}

impl Drop for Fls {
    fn drop(&mut self) {
        SLOTS.lock().free.push(self.index);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_reads_null() {
        let slot = Fls::new().unwrap();
        assert!(slot.get().is_null());
    }

    #[test]
    fn test_set_get_roundtrip_without_fiber() {
        let slot = Fls::new().unwrap();
        let mut value = 3u64;
        assert!(slot.set(&mut value as *mut u64 as *mut c_void));
        assert_eq!(slot.get() as *mut u64, &mut value as *mut u64);
    }

    #[test]
    fn test_recycled_slot_reads_null() {
        let first = Fls::new().unwrap();
        let mut value = 9u8;
        assert!(first.set(&mut value as *mut u8 as *mut c_void));
        drop(first);

        // A successor slot must not leak the old value, whether or not it
        // lands on the recycled index.
        let second = Fls::new().unwrap();
        assert!(second.get().is_null());
    }
}
