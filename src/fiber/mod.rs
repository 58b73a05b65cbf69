/*!
 * Cooperative Fibers
 *
 * User-mode execution contexts multiplexed onto one OS thread. Exactly one
 * fiber runs per thread at any instant; control moves only at an explicit
 * `switch_to` or when an entry function returns, which resumes the context
 * recorded when the fiber was entered. Nested transfers save and restore
 * that return-to edge, so mutual switch chains unwind to the right place.
 *
 * The per-fiber state is heap-pinned behind the wrapper: moving a `Fiber`
 * never relocates the saved machine context or the stack a suspended
 * transfer points at.
 */

mod context;
mod stack;

use crate::core::errors::{FiberError, FiberResult};
use crate::core::types::FiberEntryPoint;
#[cfg(feature = "diagnostics")]
use crate::diag;
use context::Context;
use stack::FiberStack;
use std::cell::{Cell, RefCell, UnsafeCell};
use std::ffi::c_void;
use std::ptr;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum FiberState {
    Suspended,
    Running,
    Exited,
}

/// Heap-pinned fiber state. Raw pointers between impls (the return-to edge,
/// the current-fiber cell) stay valid across wrapper moves because the box
/// never relocates.
struct FiberImpl {
    context: Context,
    /// `None` for a converted-thread fiber, which runs on the thread's own
    /// stack.
    stack: Option<FiberStack>,
    entry: Option<FiberEntryPoint>,
    user_data: *mut c_void,
    /// Context resumed when the entry function returns. Saved and restored
    /// around every switch into this fiber.
    exit_to: *mut FiberImpl,
    state: FiberState,
    /// Fiber-local storage values, indexed by `Fls` slot.
    slots: Vec<(u64, *mut c_void)>,
    #[cfg(feature = "diagnostics")]
    name: String,
}

thread_local! {
    /// The fiber currently running on this thread; null until the thread
    /// converts itself with `Fiber::convert_thread`.
    static CURRENT_FIBER: Cell<*mut FiberImpl> = const { Cell::new(ptr::null_mut()) };

    /// Fiber-local storage fallback for threads that run no fiber.
    static THREAD_SLOTS: RefCell<Vec<(u64, *mut c_void)>> = const { RefCell::new(Vec::new()) };
}

fn current_ptr() -> *mut FiberImpl {
    CURRENT_FIBER.with(|cell| cell.get())
}

fn set_current(raw: *mut FiberImpl) {
    CURRENT_FIBER.with(|cell| cell.set(raw));
}

/// First frame of every entry-point fiber. Runs the entry exactly once,
/// then transfers to the recorded return-to context; the fiber is never
/// resumed past this point.
extern "C" fn fiber_trampoline() {
    let raw = current_ptr();
    debug_assert!(!raw.is_null());
    unsafe {
        let fiber = &mut *raw;
        if let Some(entry) = fiber.entry {
            entry(fiber.user_data);
        }
        fiber.state = FiberState::Exited;
        #[cfg(feature = "diagnostics")]
        diag::fiber_exited(&fiber.name);

        let exit = fiber.exit_to;
        assert!(
            !exit.is_null(),
            "fiber entry returned with no context to resume"
        );
        Context::jump(&(*exit).context);
    }
}

/// Exclusive owner of one cooperative execution context.
pub struct Fiber {
    inner: Box<UnsafeCell<FiberImpl>>,
}

// A suspended fiber may be created on one thread and run on another; the
// wrapper is not Sync, and the running thread is the only one touching the
// impl between switches.
unsafe impl Send for Fiber {}

impl Fiber {
    /// Allocate a fresh suspended context with its own guarded stack.
    ///
    /// The fiber does not run until switched to; `stack_size` of zero uses
    /// the default. Stack or context setup failure is reported as an error,
    /// never a panic.
    pub fn spawn(
        entry: FiberEntryPoint,
        user_data: *mut c_void,
        stack_size: usize,
        name: Option<&str>,
    ) -> FiberResult<Fiber> {
        let stack = FiberStack::map(stack_size)?;
        let (stack_base, stack_len) = stack.area();

        let inner = Box::new(UnsafeCell::new(FiberImpl {
            context: Context::zeroed(),
            stack: Some(stack),
            entry: Some(entry),
            user_data,
            exit_to: ptr::null_mut(),
            state: FiberState::Suspended,
            slots: Vec::new(),
            #[cfg(feature = "diagnostics")]
            name: name.unwrap_or("").to_owned(),
        }));

        // The impl is at its final address now; the context may self-refer.
        unsafe {
            (*inner.get())
                .context
                .init_with_stack(stack_base, stack_len, fiber_trampoline)
                .map_err(|e| FiberError::ContextInitFailed(e.to_string()))?;
        }

        #[cfg(feature = "diagnostics")]
        diag::fiber_created(name.unwrap_or(""));
        #[cfg(not(feature = "diagnostics"))]
        let _ = name;

        Ok(Fiber { inner })
    }

    /// Wrap the calling thread's own execution context as the origin fiber.
    ///
    /// The result has no entry point, so nothing ever returns from it, and
    /// switching into it records no return edge. A thread converts at most
    /// once; a second conversion is refused.
    pub fn convert_thread(name: Option<&str>) -> FiberResult<Fiber> {
        if !current_ptr().is_null() {
            return Err(FiberError::AlreadyConverted);
        }

        let inner = Box::new(UnsafeCell::new(FiberImpl {
            context: Context::zeroed(),
            stack: None,
            entry: None,
            user_data: ptr::null_mut(),
            exit_to: ptr::null_mut(),
            state: FiberState::Running,
            slots: Vec::new(),
            #[cfg(feature = "diagnostics")]
            name: name.unwrap_or("").to_owned(),
        }));
        set_current(inner.get());

        #[cfg(feature = "diagnostics")]
        diag::fiber_created(name.unwrap_or(""));
        #[cfg(not(feature = "diagnostics"))]
        let _ = name;

        Ok(Fiber { inner })
    }

    /// Cooperatively transfer control into this fiber.
    ///
    /// The call suspends the current fiber and resumes the target where it
    /// last suspended, or at its entry point if it never ran. For an
    /// entry-point target the caller is recorded as the return-to context,
    /// with the previous edge restored once control comes back here, so
    /// nested switch chains resolve correctly. The calling thread must have
    /// been converted to a fiber first.
    pub fn switch_to(&self) {
        let target = self.inner.get();
        let me = current_ptr();
        assert!(
            !me.is_null(),
            "switch_to called on a thread that was never converted to a fiber"
        );
        assert!(me != target, "fiber switched to itself");

        unsafe {
            let fiber = &mut *target;
            assert!(
                fiber.state != FiberState::Exited,
                "switched into an exited fiber"
            );

            let saved_edge = fiber.exit_to;
            fiber.exit_to = if fiber.entry.is_some() {
                me
            } else {
                ptr::null_mut()
            };

            #[cfg(feature = "diagnostics")]
            diag::fiber_switched(&fiber.name);

            fiber.state = FiberState::Running;
            (*me).state = FiberState::Suspended;
            set_current(target);
            Context::swap(&mut (*me).context, &fiber.context);

            // Control is back on this fiber.
            set_current(me);
            (*me).state = FiberState::Running;
            fiber.exit_to = saved_edge;
        }
    }

    /// Opaque pointer supplied at creation; null for a converted thread.
    pub fn user_data(&self) -> *mut c_void {
        unsafe { (*self.inner.get()).user_data }
    }

    /// Identity of the fiber running on the calling thread, or `None` if
    /// the thread was never converted.
    pub fn current() -> Option<FiberRef> {
        let raw = current_ptr();
        if raw.is_null() {
            None
        } else {
            Some(FiberRef { raw })
        }
    }
}

impl Drop for Fiber {
    fn drop(&mut self) {
        let raw = self.inner.get();
        unsafe {
            let fiber = &mut *raw;
            if fiber.entry.is_some() {
                // Deleting a spawned fiber frees its context and stack. One
                // that never ran releases only the mapping; one that exited
                // or sits suspended is equally safe to delete. Deleting the
                // fiber that is executing right now would unmap the stack
                // under our feet.
                assert!(
                    fiber.state != FiberState::Running,
                    "fiber destroyed while running"
                );
            } else {
                // Converting back: the thread must be on its origin fiber.
                assert!(
                    current_ptr() == raw,
                    "converted-thread fiber destroyed off its own thread"
                );
                set_current(ptr::null_mut());
            }
        }
    }
}

/// Non-owning, thread-bound token for the fiber running on the calling
/// thread. Valid only while that fiber's wrapper is alive.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct FiberRef {
    raw: *mut FiberImpl,
}

impl FiberRef {
    /// Opaque pointer the referenced fiber was created with.
    pub fn user_data(&self) -> *mut c_void {
        unsafe { (*self.raw).user_data }
    }

    /// Debug name the referenced fiber was created with.
    #[cfg(feature = "diagnostics")]
    pub fn name(&self) -> String {
        unsafe { (*self.raw).name.clone() }
    }
}

/// Runs `f` on the storage table of the calling execution context: the
/// current fiber's table, or the thread fallback when no fiber runs here.
pub(crate) fn with_context_slots<R>(f: impl FnOnce(&mut Vec<(u64, *mut c_void)>) -> R) -> R {
    let raw = current_ptr();
    if raw.is_null() {
        THREAD_SLOTS.with(|slots| f(&mut slots.borrow_mut()))
    } else {
        // Only the owning thread reaches its current fiber's table.
        unsafe { f(&mut (*raw).slots) }
    }
}
