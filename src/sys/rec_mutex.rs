use super::lazy::LazyBox;

/// An OS-based recursive mutex.
///
/// The owning thread may lock it any number of times and must unlock it the
/// same number of times before another thread can acquire it.
///
/// The native lock is allocated on the heap the first time it's needed, so
/// unlike `Mutex` this type may be moved freely and a `const` value of it is
/// ready for use as a `static`.
pub struct RecMutex { inner: LazyBox<imp::RecMutex> }

unsafe impl Send for RecMutex {}
unsafe impl Sync for RecMutex {}

impl RecMutex {
    /// Creates a recursive mutex whose native state has not been allocated
    /// yet. It will be allocated on first use.
    #[inline]
    pub const fn new() -> RecMutex { RecMutex { inner: LazyBox::new() } }

    /// Allocates the native state right away instead of on first use.
    ///
    /// Behavior is undefined if the mutex has already been used.
    #[inline]
    pub unsafe fn init(&self) { self.inner.init_now() }

    /// Lock the mutex, blocking unless it is free or already held by the
    /// current thread.
    #[inline]
    pub unsafe fn lock(&self) { self.inner.get().lock() }

    /// Attempt to lock the mutex without blocking. Fails only if another
    /// thread holds it.
    #[inline]
    pub unsafe fn try_lock(&self) -> bool { self.inner.get().try_lock() }

    /// Release one level of ownership.
    ///
    /// Behavior is undefined if the current thread does not hold the mutex.
    #[inline]
    pub unsafe fn unlock(&self) { self.inner.get().unlock() }

    /// Frees the native state, if it was ever allocated.
    ///
    /// Behavior is undefined if there are current or will be future users of
    /// this mutex.
    #[inline]
    pub unsafe fn clear(&self) { self.inner.clear() }

    /// Whether the native state has been allocated yet.
    #[inline]
    pub fn is_allocated(&self) -> bool { self.inner.is_allocated() }
}

#[cfg(unix)]
mod imp {
    use std::cell::UnsafeCell;
    use std::mem::MaybeUninit;

    use crate::sys::fatal::{self, check};
    use crate::sys::lazy::LazyInit;

    pub struct RecMutex { inner: UnsafeCell<libc::pthread_mutex_t> }

    impl LazyInit for RecMutex {
        fn init() -> Box<RecMutex> {
            let m = Box::new(RecMutex {
                inner: UnsafeCell::new(libc::PTHREAD_MUTEX_INITIALIZER),
            });
            unsafe {
                let mut attr = MaybeUninit::<libc::pthread_mutexattr_t>::uninit();
                check(libc::pthread_mutexattr_init(attr.as_mut_ptr()),
                      "pthread_mutexattr_init");
                check(libc::pthread_mutexattr_settype(attr.as_mut_ptr(),
                                                      libc::PTHREAD_MUTEX_RECURSIVE),
                      "pthread_mutexattr_settype");
                check(libc::pthread_mutex_init(m.inner.get(), attr.as_ptr()),
                      "pthread_mutex_init");
                check(libc::pthread_mutexattr_destroy(attr.as_mut_ptr()),
                      "pthread_mutexattr_destroy");
            }
            m
        }

        fn destroy(m: Box<RecMutex>) {
            unsafe {
                check(libc::pthread_mutex_destroy(m.inner.get()), "pthread_mutex_destroy");
            }
        }
    }

    impl RecMutex {
        #[inline]
        pub unsafe fn lock(&self) {
            check(libc::pthread_mutex_lock(self.inner.get()), "pthread_mutex_lock");
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
        pub unsafe fn unlock(&self) {
            check(libc::pthread_mutex_unlock(self.inner.get()), "pthread_mutex_unlock");
        }
    }
}

#[cfg(windows)]
mod imp {
    use std::cell::UnsafeCell;
    use std::mem::MaybeUninit;

    use crate::sys::fatal;
    use crate::sys::ffi;
    use crate::sys::lazy::LazyInit;

    const SPIN_COUNT: ffi::DWORD = 4000;

    // Critical sections are recursive already but must be initialized at
    // their final address.
    pub struct RecMutex { inner: UnsafeCell<MaybeUninit<ffi::CRITICAL_SECTION>> }

    impl LazyInit for RecMutex {
        fn init() -> Box<RecMutex> {
            let m = Box::new(RecMutex { inner: UnsafeCell::new(MaybeUninit::uninit()) });
            unsafe {
                if ffi::InitializeCriticalSectionAndSpinCount(m.get(), SPIN_COUNT) == 0 {
                    fatal::abort(ffi::GetLastError() as i32,
                                 "InitializeCriticalSectionAndSpinCount");
                }
            }
            m
        }

        fn destroy(m: Box<RecMutex>) {
            unsafe { ffi::DeleteCriticalSection(m.get()) }
        }
    }

    impl RecMutex {
        #[inline]
        fn get(&self) -> ffi::LPCRITICAL_SECTION {
            self.inner.get().cast()
        }
        #[inline]
        pub unsafe fn lock(&self) {
            ffi::EnterCriticalSection(self.get())
        }
        #[inline]
        pub unsafe fn try_lock(&self) -> bool {
            ffi::TryEnterCriticalSection(self.get()) != 0
        }
        #[inline]
        pub unsafe fn unlock(&self) {
            ffi::LeaveCriticalSection(self.get())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc::channel;
    use std::sync::Arc;
    use std::thread;

    use super::RecMutex;

    #[test]
    fn unused_lazy_mutex_clears_to_nothing() {
        let m = RecMutex::new();
        assert!(!m.is_allocated());
        unsafe { m.clear() }
        assert!(!m.is_allocated());
    }

    #[test]
    fn first_use_allocates() {
        static M: RecMutex = RecMutex::new();
        unsafe {
            M.lock();
            assert!(M.is_allocated());
            M.unlock();
        }
    }

    #[test]
    fn reentry_needs_matching_unlocks() {
        let m = Arc::new(RecMutex::new());
        unsafe {
            m.init();
            m.lock();
            m.lock();
            assert!(m.try_lock());
        }

        let free_elsewhere = |m: &Arc<RecMutex>| {
            let m = m.clone();
            let (tx, rx) = channel();
            thread::spawn(move || unsafe {
                let got = m.try_lock();
                if got { m.unlock(); }
                tx.send(got).unwrap();
            });
            rx.recv().unwrap()
        };

        unsafe { m.unlock(); m.unlock(); }
        assert!(!free_elsewhere(&m));
        unsafe { m.unlock(); }
        assert!(free_elsewhere(&m));
        unsafe { m.clear(); }
    }
}
