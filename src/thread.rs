use std::mem;

use tracing::{debug, trace, warn};

use crate::error::ThreadError;
use crate::sys::{self, fatal};

/// Configuration for a new thread.
///
/// ```rust
/// use native_sync::Builder;
///
/// let handle = Builder::new()
///     .stack_size(256 * 1024)
///     .spawn(|| println!("hello"))
///     .unwrap();
/// handle.join();
/// ```
#[derive(Debug, Clone, Default)]
pub struct Builder {
    stack_size: Option<usize>,
}

/// An owned permission to join a thread.
///
/// Dropping the handle detaches the thread instead.
#[must_use = "dropping a JoinHandle detaches the thread"]
pub struct JoinHandle {
    native: sys::Thread,
}

/// Identifies a running thread, for comparison with other threads.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct SystemThread(sys::Thread);

impl Builder {
    /// A builder with the platform's default settings.
    pub fn new() -> Builder {
        Builder { stack_size: None }
    }

    /// Asks for a stack of `size` bytes. Sizes below the platform minimum are
    /// raised to it, and platforms that can't set a size ignore this. Zero
    /// asks for the default size.
    pub fn stack_size(mut self, size: usize) -> Builder {
        self.stack_size = Some(size);
        self
    }

    /// Starts a joinable thread running `f`.
    ///
    /// If `f` panics the process is aborted. When the system is out of
    /// threads or memory this returns `ThreadError::ResourceExhausted` and
    /// `f` is dropped without running.
    pub fn spawn<F>(self, f: F) -> Result<JoinHandle, ThreadError>
        where F: FnOnce() + Send + 'static
    {
        let native = self.create(true, Box::new(f))?;
        Ok(JoinHandle { native })
    }

    /// Starts a thread running `f` that cleans up after itself when it
    /// finishes and can't be joined.
    pub fn spawn_detached<F>(self, f: F) -> Result<(), ThreadError>
        where F: FnOnce() + Send + 'static
    {
        self.create(false, Box::new(f))?;
        Ok(())
    }

    fn create(&self, joinable: bool, main: sys::Main) -> Result<sys::Thread, ThreadError> {
        let stack_size = self.stack_size;
        match unsafe { sys::Thread::create(stack_size, joinable, main) } {
            Ok(native) => {
                debug!(?stack_size, joinable, "created thread");
                Ok(native)
            }
            Err(err) => {
                warn!(?stack_size, joinable, error = %err, "thread creation exhausted resources");
                Err(err)
            }
        }
    }
}

/// Starts a joinable thread with default settings, see `Builder::spawn`.
pub fn spawn<F>(f: F) -> Result<JoinHandle, ThreadError>
    where F: FnOnce() + Send + 'static
{
    Builder::new().spawn(f)
}

impl JoinHandle {
    /// The thread this handle refers to.
    pub fn thread(&self) -> SystemThread {
        SystemThread(self.native)
    }

    /// Waits for the thread to finish. Its effects on memory are visible to
    /// the caller afterwards.
    pub fn join(self) {
        let native = self.native;
        mem::forget(self);
        trace!("joining thread");
        unsafe { native.join() }
    }
}

impl Drop for JoinHandle {
    fn drop(&mut self) {
        trace!("detaching thread");
        unsafe { self.native.detach() }
    }
}

/// The calling thread.
pub fn current() -> SystemThread {
    SystemThread(sys::Thread::current())
}

/// Ends the calling thread without returning.
///
/// Only threads started by this crate can be ended this way. Their stack is
/// unwound first, so live values are dropped, and the thread finishes as if
/// its closure had returned. With `panic = "abort"` the unwind aborts the
/// whole process instead.
///
/// Calling this on any other thread aborts the process; `sys::exit_current`
/// is the raw form for threads without Rust frames to unwind.
pub fn exit_current() -> ! {
    if !sys::is_managed() {
        fatal::abort_with("exit_current called on a thread not started by native-sync");
    }
    unsafe { sys::exit_current() }
}

/// Lets other threads run before the calling thread continues.
pub fn yield_now() {
    sys::yield_now()
}
