/*!
 * Fiber Stack Mapping
 * Anonymous stack mapping with a no-access guard page at the low end
 */

use crate::core::errors::{FiberError, FiberResult};
use log::warn;
use nix::sys::mman::{mmap_anonymous, mprotect, munmap, MapFlags, ProtFlags};
use std::ffi::c_void;
use std::num::NonZeroUsize;
use std::ptr::NonNull;

/// Matches the platform default thread stack commit for entry fibers that
/// pass a size of zero.
const DEFAULT_STACK_SIZE: usize = 1024 * 1024;

fn page_size() -> usize {
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if size <= 0 {
        4096
    } else {
        size as usize
    }
}

/// Owns one stack mapping, unmapped exactly once on drop.
pub(crate) struct FiberStack {
    base: NonNull<c_void>,
    len: usize,
    guard: usize,
}

// The mapping is plain memory; a suspended fiber may migrate threads.
unsafe impl Send for FiberStack {}

impl FiberStack {
    /// Map a stack of at least `requested` bytes (zero means the default),
    /// rounded up to whole pages, with a guard page below the usable area.
    pub fn map(requested: usize) -> FiberResult<FiberStack> {
        let page = page_size();
        let wanted = if requested == 0 {
            DEFAULT_STACK_SIZE
        } else {
            requested
        };
        let usable = (wanted + page - 1) & !(page - 1);
        let len = usable + page;
        let length = NonZeroUsize::new(len).expect("stack mapping rounds to a nonzero length");

        let base = unsafe {
            mmap_anonymous(
                None,
                length,
                ProtFlags::PROT_READ | ProtFlags::PROT_WRITE,
                MapFlags::MAP_PRIVATE | MapFlags::MAP_STACK,
            )
        }
        .map_err(|e| FiberError::StackAllocationFailed(e.to_string()))?;

        // Stacks grow downward; the lowest page faults on overflow.
        if let Err(e) = unsafe { mprotect(base, page, ProtFlags::PROT_NONE) } {
            unsafe {
                let _ = munmap(base, len);
            }
            return Err(FiberError::StackAllocationFailed(e.to_string()));
        }

        Ok(FiberStack {
            base,
            len,
            guard: page,
        })
    }

    /// Usable area above the guard page, as (lowest address, length).
    pub fn area(&self) -> (*mut u8, usize) {
        let start = unsafe { self.base.as_ptr().cast::<u8>().add(self.guard) };
        (start, self.len - self.guard)
    }
}

impl Drop for FiberStack {
    fn drop(&mut self) {
        if let Err(e) = unsafe { munmap(self.base, self.len) } {
            warn!("fiber stack unmap failed: {}", e);
        }
    }
}
