/*!
 * Native Thread Wrapper
 *
 * OS-scheduled thread owning its handle from spawn to join. A trampoline
 * on the new thread reports lifetime markers, invokes the entry point once
 * with the caller's user-data pointer, and yields its result as the exit
 * code. Destruction joins implicitly; there is no detach.
 */

use crate::core::errors::{ThreadError, ThreadResult};
use crate::core::types::{AffinityMask, SendPtr, ThreadEntryPoint};
#[cfg(feature = "diagnostics")]
use crate::diag;
use std::ffi::c_void;
use std::mem;
use std::os::unix::thread::JoinHandleExt;
use std::panic::{self, AssertUnwindSafe};
use std::thread;

/// Exclusive owner of one native thread handle.
pub struct Thread {
    handle: Option<thread::JoinHandle<i32>>,
}

impl Thread {
    /// Spawn an OS thread running `entry` with `user_data`.
    ///
    /// A `stack_size` of zero uses the platform default. Diagnostics builds
    /// register `name` with the debugger and report lifetime markers to the
    /// instrumentation sink. Spawn failure is resource exhaustion, reported
    /// as an error rather than a panic.
    pub fn spawn(
        entry: ThreadEntryPoint,
        user_data: *mut c_void,
        stack_size: usize,
        name: Option<&str>,
    ) -> ThreadResult<Thread> {
        let mut builder = thread::Builder::new();
        if stack_size > 0 {
            builder = builder.stack_size(stack_size);
        }

        #[cfg(feature = "diagnostics")]
        let debug_name = name.unwrap_or("").to_owned();
        #[cfg(feature = "diagnostics")]
        if !debug_name.is_empty() {
            builder = builder.name(debug_name.clone());
        }
        #[cfg(not(feature = "diagnostics"))]
        let _ = name;

        let user_data = SendPtr(user_data);
        let handle = builder
            .spawn(move || {
                let user_data = user_data;
                #[cfg(feature = "diagnostics")]
                diag::thread_started(&debug_name);

                // A panicking entry point must not tear down the process;
                // it joins as -1.
                let code =
                    panic::catch_unwind(AssertUnwindSafe(|| entry(user_data.0))).unwrap_or(-1);

                #[cfg(feature = "diagnostics")]
                diag::thread_exited(&debug_name);
                code
            })
            .map_err(|e| ThreadError::SpawnFailed(e.to_string()))?;

        Ok(Thread {
            handle: Some(handle),
        })
    }

    /// Restrict the thread to the logical cores set in `mask`.
    ///
    /// Returns the previous affinity mask, or `0` on failure (including an
    /// empty mask or an already-joined thread).
    pub fn set_affinity(&self, mask: AffinityMask) -> AffinityMask {
        let Some(handle) = self.handle.as_ref() else {
            return 0;
        };
        let pthread = handle.as_pthread_t();
        let set_size = mem::size_of::<libc::cpu_set_t>();

        unsafe {
            let mut previous: libc::cpu_set_t = mem::zeroed();
            if libc::pthread_getaffinity_np(pthread, set_size, &mut previous) != 0 {
                return 0;
            }

            let mut requested: libc::cpu_set_t = mem::zeroed();
            libc::CPU_ZERO(&mut requested);
            for cpu in 0..u64::BITS as usize {
                if mask & (1 << cpu) != 0 {
                    libc::CPU_SET(cpu, &mut requested);
                }
            }
            if libc::pthread_setaffinity_np(pthread, set_size, &requested) != 0 {
                return 0;
            }

            let mut previous_mask: AffinityMask = 0;
            for cpu in 0..u64::BITS as usize {
                if libc::CPU_ISSET(cpu, &previous) {
                    previous_mask |= 1 << cpu;
                }
            }
            previous_mask
        }
    }

    /// Block until the thread terminates and return its exit code, releasing
    /// the handle. Idempotent: calls after the first return `0`.
    pub fn join(&mut self) -> i32 {
        match self.handle.take() {
            Some(handle) => handle.join().unwrap_or(-1),
            None => 0,
        }
    }
}

impl Drop for Thread {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.join();
        }
    }
}

/// Number of logical cores available to the process.
pub fn logical_core_count() -> usize {
    thread::available_parallelism()
        .map(|count| count.get())
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI32, Ordering};

    fn add_one(data: *mut c_void) -> i32 {
        let counter = unsafe { &*(data as *const AtomicI32) };
        counter.fetch_add(1, Ordering::SeqCst) + 1
    }

    #[test]
    fn test_spawn_runs_entry_once() {
        let counter = AtomicI32::new(0);
        let mut thread = Thread::spawn(
            add_one,
            &counter as *const AtomicI32 as *mut c_void,
            0,
            Some("unit-spawn"),
        )
        .unwrap();
        assert_eq!(thread.join(), 1);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_join_is_idempotent() {
        let counter = AtomicI32::new(41);
        let mut thread = Thread::spawn(
            add_one,
            &counter as *const AtomicI32 as *mut c_void,
            0,
            None,
        )
        .unwrap();
        assert_eq!(thread.join(), 42);
        assert_eq!(thread.join(), 0);
        assert_eq!(thread.join(), 0);
    }

    #[test]
    fn test_logical_core_count_positive() {
        assert!(logical_core_count() >= 1);
    }
}
