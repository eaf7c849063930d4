use std::ptr;
use std::sync::atomic::Ordering::{AcqRel, Acquire, Relaxed, Release};
use std::sync::atomic::{AtomicBool, AtomicPtr, AtomicUsize};

use libc::c_void;

pub use self::imp::Destructor;

/// A process-wide thread-local slot holding one pointer per thread.
///
/// Until `init` runs the slot is in bootstrap mode: there is a single value,
/// stored in the slot itself and shared by every thread, so the slot can be
/// used before threads exist. `init` creates the native key and switches the
/// slot to per-thread storage for good. Whatever was stored in bootstrap mode
/// is discarded by that switch: every thread reads null afterwards until it
/// stores a value of its own.
pub struct Private {
    key: AtomicUsize,
    ready: AtomicBool,
    single_value: AtomicPtr<c_void>,
}

impl Private {
    /// Creates a slot in bootstrap mode.
    pub const fn new() -> Private {
        Private {
            key: AtomicUsize::new(0),
            ready: AtomicBool::new(false),
            single_value: AtomicPtr::new(ptr::null_mut()),
        }
    }

    /// Creates the native key and switches to per-thread storage.
    ///
    /// When a thread that holds a non-null value exits, `destructor` is called
    /// with that value. The order in which the destructors of several slots
    /// run is up to the platform.
    ///
    /// Calling this more than once, or concurrently with itself, leaks a key.
    pub fn init(&self, destructor: Option<Destructor>) {
        let key = unsafe { imp::create(destructor) };
        self.key.store(key, Relaxed);
        self.ready.store(true, Release);
        self.single_value.store(ptr::null_mut(), Relaxed);
    }

    /// Whether per-thread storage is in effect.
    #[inline]
    pub fn is_ready(&self) -> bool {
        self.ready.load(Acquire)
    }

    /// Returns the calling thread's value, or null if it never stored one.
    #[inline]
    pub fn get(&self) -> *mut c_void {
        if !self.is_ready() {
            return self.single_value.load(Acquire);
        }
        unsafe { imp::get(self.key.load(Relaxed)) }
    }

    /// Stores `value` for the calling thread. The previous value is simply
    /// overwritten; no destructor runs.
    #[inline]
    pub fn set(&self, value: *mut c_void) {
        if !self.is_ready() {
            self.single_value.store(value, Release);
            return;
        }
        unsafe { imp::set(self.key.load(Relaxed), value) }
    }

    /// Deletes the native key and puts the slot back in bootstrap mode.
    ///
    /// Values other threads still hold are not destroyed on Unix; Windows
    /// runs the destructor for each of them on the calling thread. Behavior
    /// is undefined if any other thread is using the slot.
    pub unsafe fn clear(&self) {
        if self.ready.swap(false, AcqRel) {
            imp::delete(self.key.load(Relaxed));
        }
    }
}

#[cfg(unix)]
mod imp {
    use libc::c_void;

    use crate::sys::fatal::check;

    pub type Destructor = unsafe extern "C" fn(*mut c_void);

    pub unsafe fn create(destructor: Option<Destructor>) -> usize {
        let mut key: libc::pthread_key_t = 0;
        check(libc::pthread_key_create(&mut key, destructor), "pthread_key_create");
        key as usize
    }

    #[inline]
    pub unsafe fn get(key: usize) -> *mut c_void {
        // POSIX: no errors are returned from pthread_getspecific
        libc::pthread_getspecific(key as libc::pthread_key_t)
    }

    #[inline]
    pub unsafe fn set(key: usize, value: *mut c_void) {
        check(libc::pthread_setspecific(key as libc::pthread_key_t, value),
              "pthread_setspecific");
    }

    pub unsafe fn delete(key: usize) {
        check(libc::pthread_key_delete(key as libc::pthread_key_t), "pthread_key_delete");
    }
}

#[cfg(windows)]
mod imp {
    use libc::c_void;

    use crate::sys::fatal;
    use crate::sys::ffi;

    // Fiber-local storage rather than TlsAlloc: only FLS runs a callback when
    // a thread exits.
    pub type Destructor = unsafe extern "system" fn(*mut c_void);

    pub unsafe fn create(destructor: Option<Destructor>) -> usize {
        match ffi::FlsAlloc(destructor) {
            ffi::FLS_OUT_OF_INDEXES => fatal::abort(ffi::GetLastError() as i32, "FlsAlloc"),
            key => key as usize,
        }
    }

    #[inline]
    pub unsafe fn get(key: usize) -> *mut c_void {
        ffi::FlsGetValue(key as ffi::DWORD)
    }

    #[inline]
    pub unsafe fn set(key: usize, value: *mut c_void) {
        if ffi::FlsSetValue(key as ffi::DWORD, value) == 0 {
            fatal::abort(ffi::GetLastError() as i32, "FlsSetValue");
        }
    }

    pub unsafe fn delete(key: usize) {
        if ffi::FlsFree(key as ffi::DWORD) == 0 {
            fatal::abort(ffi::GetLastError() as i32, "FlsFree");
        }
    }
}
