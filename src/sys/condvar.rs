use std::time::{Duration, SystemTime};

use crate::sys::{mutex, Mutex};

/// An OS-based condition variable.
///
/// This structure is the lowest layer possible on top of the OS-provided
/// condition variables. It is consequently entirely unsafe to use. It is
/// recommended to use the safer types at the top level of this crate instead of
/// this type.
pub struct Condvar(imp::Condvar);

unsafe impl Send for Condvar {}
unsafe impl Sync for Condvar {}

impl Condvar {
    /// Creates a condition variable in its static state, usable without
    /// `init`.
    ///
    /// Behavior is undefined if the condition variable is moved after it is
    /// first used with any of the functions below.
    #[inline]
    pub const fn new() -> Condvar { Condvar(imp::Condvar::new()) }

    /// Initializes the condition variable in place.
    ///
    /// Behavior is undefined if it has already been used.
    #[inline]
    pub unsafe fn init(&self) { self.0.init() }

    /// Signal one waiter on this condition variable to wake up.
    #[inline]
    pub unsafe fn signal(&self) { self.0.signal() }

    /// Awaken all current waiters on this condition variable.
    #[inline]
    pub unsafe fn broadcast(&self) { self.0.broadcast() }

    /// Wait for a signal on the specified mutex.
    ///
    /// The mutex is released while the thread is parked and held again when
    /// this returns. Wake-ups may be spurious.
    ///
    /// Behavior is undefined if the mutex is not locked by the current thread.
    /// Behavior is also undefined if more than one mutex is used concurrently
    /// on this condition variable.
    #[inline]
    pub unsafe fn wait(&self, mutex: &Mutex) { self.0.wait(mutex::raw(mutex)) }

    /// Wait for a signal on the specified mutex, but not past the absolute
    /// wall-clock time `deadline`. Without a deadline this is `wait`.
    ///
    /// Returns `false` if the deadline passed first, `true` otherwise.
    ///
    /// Behavior is undefined if the mutex is not locked by the current thread.
    /// Behavior is also undefined if more than one mutex is used concurrently
    /// on this condition variable.
    pub unsafe fn wait_until(&self, mutex: &Mutex, deadline: Option<SystemTime>) -> bool {
        match deadline {
            Some(deadline) => self.0.wait_until(mutex::raw(mutex), deadline),
            None => {
                self.wait(mutex);
                true
            }
        }
    }

    /// Wait for a signal on the specified mutex with a timeout duration
    /// specified by `dur` (a relative time into the future).
    ///
    /// The deadline is computed once, so callers looping on a predicate should
    /// compute it themselves and use `wait_until`.
    #[inline]
    pub unsafe fn wait_timeout(&self, mutex: &Mutex, dur: Duration) -> bool {
        self.wait_until(mutex, SystemTime::now().checked_add(dur))
    }

    /// Deallocate all resources associated with this condition variable.
    ///
    /// Behavior is undefined if there are current or will be future users of
    /// this condition variable.
    #[inline]
    pub unsafe fn clear(&self) { self.0.clear() }
}

#[cfg(unix)]
mod imp {
    use std::cell::UnsafeCell;
    use std::ptr;
    use std::time::SystemTime;

    use crate::sys::fatal::{self, check};
    use crate::sys::ffi;

    pub struct Condvar { inner: UnsafeCell<libc::pthread_cond_t> }

    impl Condvar {
        pub const fn new() -> Condvar {
            // Might be moved and address is changing it is better to avoid
            // initialization of potentially opaque OS data before it landed
            Condvar { inner: UnsafeCell::new(libc::PTHREAD_COND_INITIALIZER) }
        }

        pub unsafe fn init(&self) {
            check(libc::pthread_cond_init(self.inner.get(), ptr::null()),
                  "pthread_cond_init");
        }

        #[inline]
        pub unsafe fn signal(&self) {
            check(libc::pthread_cond_signal(self.inner.get()), "pthread_cond_signal");
        }

        #[inline]
        pub unsafe fn broadcast(&self) {
            check(libc::pthread_cond_broadcast(self.inner.get()), "pthread_cond_broadcast");
        }

        #[inline]
        pub unsafe fn wait(&self, mutex: *mut libc::pthread_mutex_t) {
            check(libc::pthread_cond_wait(self.inner.get(), mutex), "pthread_cond_wait");
        }

        pub unsafe fn wait_until(&self, mutex: *mut libc::pthread_mutex_t,
                                 deadline: SystemTime) -> bool {
            let timeout = ffi::timespec_from(deadline);
            match libc::pthread_cond_timedwait(self.inner.get(), mutex, &timeout) {
                0 => true,
                libc::ETIMEDOUT => false,
                status => fatal::abort(status, "pthread_cond_timedwait"),
            }
        }

        #[inline]
        pub unsafe fn clear(&self) {
            check(libc::pthread_cond_destroy(self.inner.get()), "pthread_cond_destroy");
        }
    }
}

#[cfg(windows)]
mod imp {
    use std::cell::UnsafeCell;
    use std::time::SystemTime;

    use crate::sys::fatal;
    use crate::sys::ffi;

    pub struct Condvar { inner: UnsafeCell<ffi::CONDITION_VARIABLE> }

    impl Condvar {
        pub const fn new() -> Condvar {
            Condvar { inner: UnsafeCell::new(ffi::CONDITION_VARIABLE_INIT) }
        }

        #[inline]
        pub unsafe fn init(&self) {}

        #[inline]
        pub unsafe fn wait(&self, mutex: ffi::PSRWLOCK) {
            let r = ffi::SleepConditionVariableSRW(self.inner.get(), mutex,
                                                   ffi::INFINITE, 0);
            if r == 0 {
                fatal::abort(ffi::GetLastError() as i32, "SleepConditionVariableSRW");
            }
        }

        pub unsafe fn wait_until(&self, mutex: ffi::PSRWLOCK,
                                 deadline: SystemTime) -> bool {
            // The native call only takes a relative timeout in milliseconds,
            // rounded up so that we never wake before the deadline.
            let ms = match deadline.duration_since(SystemTime::now()) {
                Ok(left) => {
                    let ms = left.as_nanos().div_ceil(1_000_000);
                    ms.min((ffi::INFINITE - 1) as u128) as ffi::DWORD
                }
                Err(_) => 0,
            };
            let r = ffi::SleepConditionVariableSRW(self.inner.get(), mutex, ms, 0);
            if r != 0 {
                return true;
            }
            match ffi::GetLastError() {
                ffi::ERROR_TIMEOUT => false,
                err => fatal::abort(err as i32, "SleepConditionVariableSRW"),
            }
        }

        #[inline]
        pub unsafe fn signal(&self) {
            ffi::WakeConditionVariable(self.inner.get())
        }

        #[inline]
        pub unsafe fn broadcast(&self) {
            ffi::WakeAllConditionVariable(self.inner.get())
        }

        #[inline]
        pub unsafe fn clear(&self) {}
    }
}
