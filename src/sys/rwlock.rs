/// An OS-based reader-writer lock.
///
/// Any number of readers may hold the lock at once (up to a platform-defined
/// ceiling), a writer excludes everyone else. Which of waiting readers and
/// writers gets the lock first is up to the platform. A thread already holding
/// a read lock may take another one; recursive write locking is not supported.
pub struct RwLock(imp::RwLock);

unsafe impl Send for RwLock {}
unsafe impl Sync for RwLock {}

impl RwLock {
    /// Creates a lock in its static state, usable without `init`.
    ///
    /// Behavior is undefined if the lock is moved after it is first used.
    #[inline]
    pub const fn new() -> RwLock { RwLock(imp::RwLock::new()) }

    /// Initializes the lock in place.
    ///
    /// Behavior is undefined if the lock has already been used.
    #[inline]
    pub unsafe fn init(&self) { self.0.init() }

    /// Acquires shared access, blocking while a writer holds the lock.
    #[inline]
    pub unsafe fn read(&self) { self.0.read() }

    /// Attempts to acquire shared access without blocking.
    #[inline]
    pub unsafe fn try_read(&self) -> bool { self.0.try_read() }

    /// Acquires exclusive access, blocking while anyone else holds the lock.
    #[inline]
    pub unsafe fn write(&self) { self.0.write() }

    /// Attempts to acquire exclusive access without blocking.
    #[inline]
    pub unsafe fn try_write(&self) -> bool { self.0.try_write() }

    /// Releases shared access.
    ///
    /// Behavior is undefined if the current thread does not hold a read lock.
    #[inline]
    pub unsafe fn read_unlock(&self) { self.0.read_unlock() }

    /// Releases exclusive access.
    ///
    /// Behavior is undefined if the current thread does not hold the write
    /// lock.
    #[inline]
    pub unsafe fn write_unlock(&self) { self.0.write_unlock() }

    /// Deallocate all resources associated with this lock.
    ///
    /// Behavior is undefined if there are current or will be future users of
    /// this lock.
    #[inline]
    pub unsafe fn clear(&self) { self.0.clear() }
}

#[cfg(unix)]
mod imp {
    use std::cell::UnsafeCell;
    use std::ptr;

    use crate::sys::fatal::{self, check};

    pub struct RwLock { inner: UnsafeCell<libc::pthread_rwlock_t> }

    impl RwLock {
        pub const fn new() -> RwLock {
            // Might be moved and address is changing it is better to avoid
            // initialization of potentially opaque OS data before it landed
            RwLock { inner: UnsafeCell::new(libc::PTHREAD_RWLOCK_INITIALIZER) }
        }
        pub unsafe fn init(&self) {
            check(libc::pthread_rwlock_init(self.inner.get(), ptr::null()),
                  "pthread_rwlock_init");
        }
        pub unsafe fn read(&self) {
            check(libc::pthread_rwlock_rdlock(self.inner.get()), "pthread_rwlock_rdlock");
        }
        pub unsafe fn try_read(&self) -> bool {
            // EAGAIN means the reader ceiling was hit, which is contention too
            match libc::pthread_rwlock_tryrdlock(self.inner.get()) {
                0 => true,
                libc::EBUSY | libc::EAGAIN => false,
                status => fatal::abort(status, "pthread_rwlock_tryrdlock"),
            }
        }
        pub unsafe fn write(&self) {
            check(libc::pthread_rwlock_wrlock(self.inner.get()), "pthread_rwlock_wrlock");
        }
        pub unsafe fn try_write(&self) -> bool {
            match libc::pthread_rwlock_trywrlock(self.inner.get()) {
                0 => true,
                libc::EBUSY => false,
                status => fatal::abort(status, "pthread_rwlock_trywrlock"),
            }
        }
        pub unsafe fn read_unlock(&self) {
            check(libc::pthread_rwlock_unlock(self.inner.get()), "pthread_rwlock_unlock");
        }
        pub unsafe fn write_unlock(&self) { self.read_unlock() }
        pub unsafe fn clear(&self) {
            check(libc::pthread_rwlock_destroy(self.inner.get()), "pthread_rwlock_destroy");
        }
    }
}

#[cfg(windows)]
mod imp {
    use std::cell::UnsafeCell;

    use crate::sys::ffi;

    pub struct RwLock { inner: UnsafeCell<ffi::SRWLOCK> }

    impl RwLock {
        pub const fn new() -> RwLock {
            RwLock { inner: UnsafeCell::new(ffi::SRWLOCK_INIT) }
        }
        pub unsafe fn init(&self) {}
        pub unsafe fn read(&self) {
            ffi::AcquireSRWLockShared(self.inner.get())
        }
        pub unsafe fn try_read(&self) -> bool {
            ffi::TryAcquireSRWLockShared(self.inner.get()) != 0
        }
        pub unsafe fn write(&self) {
            ffi::AcquireSRWLockExclusive(self.inner.get())
        }
        pub unsafe fn try_write(&self) -> bool {
            ffi::TryAcquireSRWLockExclusive(self.inner.get()) != 0
        }
        pub unsafe fn read_unlock(&self) {
            ffi::ReleaseSRWLockShared(self.inner.get())
        }
        pub unsafe fn write_unlock(&self) {
            ffi::ReleaseSRWLockExclusive(self.inner.get())
        }
        pub unsafe fn clear(&self) {}
    }
}
