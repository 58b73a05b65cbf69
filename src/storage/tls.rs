/*!
 * Thread-Local Storage Slot
 * One opaque pointer per OS thread over a native storage key
 */

use crate::core::errors::{StorageError, StorageResult};
use std::ffi::c_void;
use std::io;

/// Exclusive owner of one native thread-local key. Each thread sees its own
/// value; a thread that never wrote reads null.
pub struct Tls {
    key: libc::pthread_key_t,
}

impl Tls {
    /// Allocate a process-wide key. Exhausting the native key space is
    /// reported as an error.
    pub fn new() -> StorageResult<Tls> {
        let mut key: libc::pthread_key_t = 0;
        let rc = unsafe { libc::pthread_key_create(&mut key, None) };
        if rc != 0 {
            return Err(StorageError::KeyAllocationFailed(
                io::Error::from_raw_os_error(rc).to_string(),
            ));
        }
        Ok(Tls { key })
    }

    /// Store `value` for the calling thread. Returns whether the store
    /// succeeded.
    pub fn set(&self, value: *mut c_void) -> bool {
        unsafe { libc::pthread_setspecific(self.key, value as *const c_void) == 0 }
    }

    /// Value stored by the calling thread, or null if it never wrote.
    pub fn get(&self) -> *mut c_void {
        unsafe { libc::pthread_getspecific(self.key) }
    }
}

impl Drop for Tls {
    fn drop(&mut self) {
        unsafe {
            libc::pthread_key_delete(self.key);
        }
    }
}
