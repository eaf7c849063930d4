pub use self::imp::raw;

/// An OS-based mutual exclusion lock.
///
/// This is the thinnest cross-platform wrapper around OS mutexes. All usage of
/// this mutex is unsafe and it is recommended to instead use the safe wrapper
/// at the top level of the crate instead of this type.
///
/// Whether a thread that already holds the lock can lock it again is left to
/// the platform. Use `RecMutex` when re-entry is needed.
pub struct Mutex(imp::Mutex);

unsafe impl Send for Mutex {}
unsafe impl Sync for Mutex {}

impl Mutex {
    /// Creates a mutex in its static state.
    ///
    /// The returned value is usable without calling `init`, which makes it
    /// suitable for `static` items. Behavior is undefined if the mutex is
    /// moved after the first method is called on it.
    #[inline]
    pub const fn new() -> Mutex { Mutex(imp::Mutex::new()) }

    /// Initializes the mutex in place, with the platform's preferred
    /// attributes.
    ///
    /// Behavior is undefined if the mutex has already been used, or if it is
    /// moved afterwards.
    #[inline]
    pub unsafe fn init(&self) { self.0.init() }

    /// Lock the mutex blocking the current thread until it is available.
    ///
    /// Behavior is undefined if the mutex has been moved between this and any
    /// previous function call.
    #[inline]
    pub unsafe fn lock(&self) { self.0.lock() }

    /// Attempt to lock the mutex without blocking, returning whether it was
    /// successfully acquired or not.
    ///
    /// Behavior is undefined if the mutex has been moved between this and any
    /// previous function call.
    #[inline]
    pub unsafe fn try_lock(&self) -> bool { self.0.try_lock() }

    /// Unlock the mutex.
    ///
    /// Behavior is undefined if the current thread does not actually hold the
    /// mutex.
    #[inline]
    pub unsafe fn unlock(&self) { self.0.unlock() }

    /// Deallocate all resources associated with this mutex.
    ///
    /// Behavior is undefined if there are current or will be future users of
    /// this mutex.
    #[inline]
    pub unsafe fn clear(&self) { self.0.clear() }
}

#[cfg(unix)]
mod imp {
    use std::cell::UnsafeCell;
    use std::mem::MaybeUninit;

    use crate::sys::fatal::{self, check};

    pub struct Mutex { inner: UnsafeCell<libc::pthread_mutex_t> }

    #[inline]
    pub fn raw(m: &super::Mutex) -> *mut libc::pthread_mutex_t {
        m.0.inner.get()
    }

    impl Mutex {
        pub const fn new() -> Mutex {
            // Might be moved and address is changing it is better to avoid
            // initialization of potentially opaque OS data before it landed
            Mutex { inner: UnsafeCell::new(libc::PTHREAD_MUTEX_INITIALIZER) }
        }
        pub unsafe fn init(&self) {
            let mut attr = MaybeUninit::<libc::pthread_mutexattr_t>::uninit();
            check(libc::pthread_mutexattr_init(attr.as_mut_ptr()),
                  "pthread_mutexattr_init");
            #[cfg(all(target_os = "linux", target_env = "gnu"))]
            check(libc::pthread_mutexattr_settype(attr.as_mut_ptr(),
                                                  crate::sys::ffi::PTHREAD_MUTEX_ADAPTIVE_NP),
                  "pthread_mutexattr_settype");
            check(libc::pthread_mutex_init(self.inner.get(), attr.as_ptr()),
                  "pthread_mutex_init");
            check(libc::pthread_mutexattr_destroy(attr.as_mut_ptr()),
                  "pthread_mutexattr_destroy");
        }
        #[inline]
        pub unsafe fn lock(&self) {
            check(libc::pthread_mutex_lock(self.inner.get()), "pthread_mutex_lock");
        }
        #[inline]
        pub unsafe fn unlock(&self) {
            check(libc::pthread_mutex_unlock(self.inner.get()), "pthread_mutex_unlock");
        }
        #[inline]
        pub unsafe fn try_lock(&self) -> bool {
            match libc::pthread_mutex_trylock(self.inner.get()) {
                0 => true,
                libc::EBUSY => false,
                status => fatal::abort(status, "pthread_mutex_trylock"),
            }
        }
        #[inline]
        pub unsafe fn clear(&self) {
            check(libc::pthread_mutex_destroy(self.inner.get()), "pthread_mutex_destroy");
        }
    }
}

#[cfg(windows)]
mod imp {
    use std::cell::UnsafeCell;

    use crate::sys::ffi;

    // Slim reader/writer locks are statically initializable, need no teardown
    // and, unlike critical sections, are not recursive.
    pub struct Mutex { inner: UnsafeCell<ffi::SRWLOCK> }

    #[inline]
    pub fn raw(m: &super::Mutex) -> ffi::PSRWLOCK {
        m.0.inner.get()
    }

    impl Mutex {
        pub const fn new() -> Mutex {
            Mutex { inner: UnsafeCell::new(ffi::SRWLOCK_INIT) }
        }
        #[inline]
        pub unsafe fn init(&self) {}
        #[inline]
        pub unsafe fn lock(&self) {
            ffi::AcquireSRWLockExclusive(self.inner.get())
        }
        #[inline]
        pub unsafe fn try_lock(&self) -> bool {
            ffi::TryAcquireSRWLockExclusive(self.inner.get()) != 0
        }
        #[inline]
        pub unsafe fn unlock(&self) {
            ffi::ReleaseSRWLockExclusive(self.inner.get())
        }
        #[inline]
        pub unsafe fn clear(&self) {}
    }
}
