/*!
 * User Execution Context
 * The only module touching the raw ucontext family
 */

use std::ffi::c_void;
use std::io;
use std::mem;
use std::ptr;

/// One saved user-mode execution context. Storage is plain data until
/// `init_with_stack` or a swap saves into it; after either, it must stay at
/// a stable address because the saved machine state points into itself.
#[repr(transparent)]
pub(crate) struct Context(libc::ucontext_t);

impl Context {
    pub fn zeroed() -> Context {
        Context(unsafe { mem::zeroed() })
    }

    /// Point this context at a fresh stack and entry function. Must be
    /// called at the context's final address.
    pub unsafe fn init_with_stack(
        &mut self,
        stack_base: *mut u8,
        stack_len: usize,
        entry: extern "C" fn(),
    ) -> io::Result<()> {
        if libc::getcontext(&mut self.0) != 0 {
            return Err(io::Error::last_os_error());
        }
        self.0.uc_stack.ss_sp = stack_base as *mut c_void;
        self.0.uc_stack.ss_size = stack_len;
        // No successor context: the entry trampoline transfers out
        // explicitly and never falls off its end.
        self.0.uc_link = ptr::null_mut();
        libc::makecontext(&mut self.0, entry, 0);
        Ok(())
    }

    /// Suspend the calling context into `save` and resume `resume`.
    pub unsafe fn swap(save: *mut Context, resume: *const Context) {
        libc::swapcontext(&mut (*save).0, &(*resume).0);
    }

    /// One-way transfer into `resume`; the calling context is abandoned.
    pub unsafe fn jump(resume: *const Context) -> ! {
        libc::setcontext(&(*resume).0);
        unreachable!("setcontext returned");
    }
}
