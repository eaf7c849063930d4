use std::cell::Cell;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use crate::error::ThreadError;
use crate::sys::fatal;

/// The body of a thread, boxed so it can cross the native entry point as a
/// single pointer.
pub type Main = Box<dyn FnOnce() + Send + 'static>;

/// A handle to a native thread.
///
/// Handles are plain values: copying one does not copy the responsibility to
/// join. A joinable thread must be joined or detached exactly once; joining a
/// detached thread, or joining twice, is undefined behavior.
#[derive(Clone, Copy)]
pub struct Thread(imp::Thread);

unsafe impl Send for Thread {}
unsafe impl Sync for Thread {}

thread_local! {
    // Set on threads started by `Thread::create`, whose entry point knows how
    // to catch an `exit_current` unwind.
    static MANAGED: Cell<bool> = const { Cell::new(false) };
}

// Unwind payload used by `exit_current`.
struct Exit;

impl Thread {
    /// Starts a new thread running `main`.
    ///
    /// A stack size hint is raised to the platform minimum if it is below it;
    /// a platform that can't honour the hint at all runs the thread on its
    /// default stack. `joinable` selects whether the thread must later be
    /// joined or cleans up after itself.
    ///
    /// A hint of zero means no hint.
    ///
    /// Running out of threads or memory for a new stack is reported as
    /// `ThreadError::ResourceExhausted`. Any other failure aborts the process.
    pub unsafe fn create(stack_size: Option<usize>, joinable: bool, main: Main)
                         -> Result<Thread, ThreadError> {
        match imp::create(stack_size.filter(|&size| size != 0), joinable, main) {
            Ok(native) => Ok(Thread(native)),
            Err(source) => Err(ThreadError::ResourceExhausted { source }),
        }
    }

    /// Blocks until the thread has finished. Everything the thread did is
    /// visible to the caller once this returns.
    pub unsafe fn join(self) {
        self.0.join()
    }

    /// Gives up the right to join a joinable thread; its resources are
    /// released when it finishes.
    pub unsafe fn detach(self) {
        self.0.detach()
    }

    /// The calling thread.
    pub fn current() -> Thread {
        Thread(imp::Thread::current())
    }

    /// Whether both handles name the same thread.
    pub fn equal(&self, other: &Thread) -> bool {
        self.0.equal(&other.0)
    }
}

impl PartialEq for Thread {
    fn eq(&self, other: &Thread) -> bool {
        self.equal(other)
    }
}

impl Eq for Thread {}

impl fmt::Debug for Thread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Thread").finish_non_exhaustive()
    }
}

/// Whether the calling thread was started by `Thread::create`.
pub fn is_managed() -> bool {
    MANAGED.try_with(Cell::get).unwrap_or(false)
}

/// Terminates the calling thread.
///
/// On a thread started by `Thread::create` this unwinds back to the thread's
/// entry point, running destructors on the way, and the thread then finishes
/// as if `main` had returned. A `catch_unwind` between here and the entry
/// point will intercept it. Built with `panic = "abort"`, the unwind aborts
/// the process instead.
///
/// Any other thread is ended by the native exit call. That call may unwind
/// the thread in a way Rust frames can't cope with, so it must only be used
/// on threads with no Rust frames below the caller, such as a C thread
/// calling straight into this function.
pub unsafe fn exit_current() -> ! {
    if is_managed() {
        panic::resume_unwind(Box::new(Exit));
    }
    imp::exit()
}

/// Offers the rest of the calling thread's time slice to other threads.
pub fn yield_now() {
    imp::yield_now()
}

// Runs on the new thread, between the native entry point and `main`.
fn run(main: Main) {
    MANAGED.with(|m| m.set(true));
    match panic::catch_unwind(AssertUnwindSafe(main)) {
        Ok(()) => {}
        Err(payload) if payload.is::<Exit>() => {}
        // The panic hook has already reported it and there is nobody to hand
        // the payload to.
        Err(_) => fatal::abort_with("thread start routine panicked"),
    }
}

#[cfg(unix)]
mod imp {
    use std::cmp;
    use std::io;
    use std::mem;
    use std::ptr;

    use libc::c_void;

    use super::{run, Main};
    use crate::sys::fatal::{self, check};
    use crate::sys::ffi;

    #[derive(Clone, Copy)]
    pub struct Thread { native: libc::pthread_t }

    extern "C" fn thread_start(arg: *mut c_void) -> *mut c_void {
        let main = unsafe { Box::from_raw(arg as *mut Main) };
        run(*main);
        ptr::null_mut()
    }

    pub unsafe fn create(stack_size: Option<usize>, joinable: bool, main: Main)
                         -> io::Result<Thread> {
        let arg = Box::into_raw(Box::new(main));

        let mut attr: libc::pthread_attr_t = mem::zeroed();
        check(libc::pthread_attr_init(&mut attr), "pthread_attr_init");

        if let Some(size) = stack_size {
            let size = cmp::max(size, ffi::min_stack_size());
            // Some systems can't do this, and a thread shouldn't fail to
            // start because of it.
            let _ = libc::pthread_attr_setstacksize(&mut attr, size);
        }

        let state = if joinable {
            libc::PTHREAD_CREATE_JOINABLE
        } else {
            libc::PTHREAD_CREATE_DETACHED
        };
        check(libc::pthread_attr_setdetachstate(&mut attr, state),
              "pthread_attr_setdetachstate");

        let mut native: libc::pthread_t = mem::zeroed();
        let ret = libc::pthread_create(&mut native, &attr, thread_start, arg as *mut c_void);
        check(libc::pthread_attr_destroy(&mut attr), "pthread_attr_destroy");

        match ret {
            0 => Ok(Thread { native }),
            libc::EAGAIN | libc::ENOMEM => {
                drop(Box::from_raw(arg));
                Err(io::Error::from_raw_os_error(ret))
            }
            status => {
                drop(Box::from_raw(arg));
                fatal::abort(status, "pthread_create")
            }
        }
    }

    impl Thread {
        pub fn current() -> Thread {
            Thread { native: unsafe { libc::pthread_self() } }
        }

        pub fn equal(&self, other: &Thread) -> bool {
            unsafe { libc::pthread_equal(self.native, other.native) != 0 }
        }

        pub unsafe fn join(self) {
            let mut ignore = ptr::null_mut();
            check(libc::pthread_join(self.native, &mut ignore), "pthread_join");
        }

        pub unsafe fn detach(self) {
            check(libc::pthread_detach(self.native), "pthread_detach");
        }
    }

    pub unsafe fn exit() -> ! {
        libc::pthread_exit(ptr::null_mut())
    }

    pub fn yield_now() {
        unsafe { libc::sched_yield() };
    }
}

#[cfg(windows)]
mod imp {
    use std::io;
    use std::ptr;

    use libc::c_void;

    use super::{run, Main};
    use crate::sys::fatal;
    use crate::sys::ffi;

    // Threads are compared by id; `handle` is null for detached threads and
    // for handles obtained through `current`.
    #[derive(Clone, Copy)]
    pub struct Thread { handle: ffi::HANDLE, id: ffi::DWORD }

    unsafe extern "system" fn thread_start(arg: *mut c_void) -> ffi::DWORD {
        let main = Box::from_raw(arg as *mut Main);
        run(*main);
        0
    }

    pub unsafe fn create(stack_size: Option<usize>, joinable: bool, main: Main)
                         -> io::Result<Thread> {
        let arg = Box::into_raw(Box::new(main));

        // Windows has no minimum to query; 0 asks for the default size.
        let mut id = 0;
        let handle = ffi::CreateThread(ptr::null_mut(),
                                       stack_size.unwrap_or(0),
                                       thread_start,
                                       arg as *mut c_void,
                                       ffi::STACK_SIZE_PARAM_IS_A_RESERVATION,
                                       &mut id);
        if handle.is_null() {
            drop(Box::from_raw(arg));
            return match ffi::GetLastError() {
                err @ (ffi::ERROR_NOT_ENOUGH_MEMORY | ffi::ERROR_OUTOFMEMORY) => {
                    Err(io::Error::from_raw_os_error(err as i32))
                }
                err => fatal::abort(err as i32, "CreateThread"),
            };
        }

        let mut thread = Thread { handle, id };
        if !joinable {
            thread.close();
        }
        Ok(thread)
    }

    impl Thread {
        pub fn current() -> Thread {
            Thread { handle: ptr::null_mut(), id: unsafe { ffi::GetCurrentThreadId() } }
        }

        pub fn equal(&self, other: &Thread) -> bool {
            self.id == other.id
        }

        pub unsafe fn join(mut self) {
            if ffi::WaitForSingleObject(self.handle, ffi::INFINITE) == ffi::WAIT_FAILED {
                fatal::abort(ffi::GetLastError() as i32, "WaitForSingleObject");
            }
            self.close();
        }

        pub unsafe fn detach(mut self) {
            self.close();
        }

        unsafe fn close(&mut self) {
            if ffi::CloseHandle(self.handle) == 0 {
                fatal::abort(ffi::GetLastError() as i32, "CloseHandle");
            }
            self.handle = ptr::null_mut();
        }
    }

    pub unsafe fn exit() -> ! {
        ffi::ExitThread(0)
    }

    pub fn yield_now() {
        unsafe { ffi::SwitchToThread() };
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering::SeqCst;
    use std::sync::mpsc::channel;
    use std::sync::Arc;

    use super::{exit_current, is_managed, yield_now, Thread};
    use crate::error::ErrorKind;

    #[test]
    fn join_sees_side_effects() {
        let hits = Arc::new(AtomicUsize::new(0));
        let hits2 = hits.clone();
        unsafe {
            let t = Thread::create(None, true, Box::new(move || {
                hits2.store(42, SeqCst);
            })).unwrap();
            t.join();
        }
        assert_eq!(hits.load(SeqCst), 42);
    }

    #[test]
    fn current_inside_equals_created_handle() {
        let (tx, rx) = channel();
        let t = unsafe {
            Thread::create(Some(64 * 1024), true, Box::new(move || {
                tx.send(Thread::current()).unwrap();
            })).unwrap()
        };
        let seen = rx.recv().unwrap();
        assert!(seen.equal(&t));
        assert!(t != Thread::current());
        assert_eq!(Thread::current(), Thread::current());
        unsafe { t.join() }
    }

    #[test]
    fn detached_thread_runs() {
        let (tx, rx) = channel();
        unsafe {
            Thread::create(None, false, Box::new(move || {
                yield_now();
                tx.send(7).unwrap();
            })).unwrap();
        }
        assert_eq!(rx.recv().unwrap(), 7);
    }

    #[test]
    fn tiny_stack_hint_is_raised_to_the_floor() {
        let (tx, rx) = channel();
        unsafe {
            let t = Thread::create(Some(1), true, Box::new(move || {
                tx.send(()).unwrap();
            })).unwrap();
            t.join();
        }
        rx.recv().unwrap();
    }

    #[test]
    fn only_created_threads_are_managed() {
        assert!(!is_managed());
        assert!(!std::thread::spawn(is_managed).join().unwrap());

        let (tx, rx) = channel();
        unsafe {
            let t = Thread::create(None, true, Box::new(move || {
                tx.send(is_managed()).unwrap();
            })).unwrap();
            t.join();
        }
        assert!(rx.recv().unwrap());
    }

    #[test]
    fn zero_stack_hint_means_default() {
        let (tx, rx) = channel();
        unsafe {
            let t = Thread::create(Some(0), true, Box::new(move || {
                let buf = [1u8; 256 * 1024];
                tx.send(std::hint::black_box(&buf).iter().map(|&b| b as usize).sum::<usize>())
                    .unwrap();
            })).unwrap();
            t.join();
        }
        assert_eq!(rx.recv().unwrap(), 256 * 1024);
    }

    #[test]
    fn exit_current_finishes_like_a_return() {
        let reached = Arc::new(AtomicUsize::new(0));
        let reached2 = reached.clone();
        unsafe {
            let t = Thread::create(None, true, Box::new(move || {
                reached2.fetch_add(1, SeqCst);
                exit_current();
            })).unwrap();
            t.join();
        }
        assert_eq!(reached.load(SeqCst), 1);
    }

    // No machine has room for a stack this large, so creation fails with
    // the recoverable error instead of taking the process down.
    #[cfg(all(target_os = "linux", target_pointer_width = "64"))]
    #[test]
    fn impossible_stack_reports_exhaustion() {
        let ran = Arc::new(AtomicUsize::new(0));
        let ran2 = ran.clone();
        let err = unsafe {
            Thread::create(Some(1 << 60), true, Box::new(move || {
                ran2.fetch_add(1, SeqCst);
            })).unwrap_err()
        };
        assert_eq!(err.kind(), ErrorKind::ResourceExhausted);
        // The closure was dropped without running.
        assert_eq!(Arc::strong_count(&ran), 1);
        assert_eq!(ran.load(SeqCst), 0);
    }
}
