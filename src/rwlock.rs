use std::marker::PhantomData;

use crate::sys;

/// A reader-writer lock.
///
/// Any number of readers may hold the lock at the same time, while a writer
/// has it to itself. Whether waiting writers are preferred over new readers is
/// left to the platform.
///
/// # Example
///
/// ```rust
/// use native_sync::RwLock;
///
/// let lock = RwLock::new();
/// {
///     let _a = lock.read();
///     let _b = lock.read(); // many readers at once
/// }
/// drop(lock.write());
/// ```
pub struct RwLock {
    // Boxed for the same reason as `Mutex`: the native lock must not move.
    inner: Box<sys::RwLock>,
}

/// A reader-writer lock usable as a `static` without any setup.
pub struct StaticRwLock {
    inner: sys::RwLock,
}

/// Shared access to a lock, released on drop.
#[must_use]
pub struct RwLockReadGuard<'a> {
    lock: &'a sys::RwLock,
    _marker: PhantomData<*const ()>,
}

/// Exclusive access to a lock, released on drop.
#[must_use]
pub struct RwLockWriteGuard<'a> {
    lock: &'a sys::RwLock,
    _marker: PhantomData<*const ()>,
}

impl RwLock {
    pub fn new() -> RwLock {
        let inner = Box::new(sys::RwLock::new());
        unsafe { inner.init() }
        RwLock { inner }
    }

    /// Locks this rwlock with shared read access, blocking the current thread
    /// until it can be acquired.
    ///
    /// A thread that already holds a read lock may take another, but
    /// requesting a read lock while holding the write lock deadlocks.
    pub fn read(&self) -> RwLockReadGuard<'_> {
        unsafe { self.inner.read() }
        RwLockReadGuard::new(&self.inner)
    }

    /// Attempts to acquire shared access without blocking.
    ///
    /// Returns `None` if a writer holds the lock, or if the platform has run
    /// out of room for more readers.
    pub fn try_read(&self) -> Option<RwLockReadGuard<'_>> {
        if unsafe { self.inner.try_read() } {
            Some(RwLockReadGuard::new(&self.inner))
        } else {
            None
        }
    }

    /// Locks this rwlock with exclusive write access, blocking the current
    /// thread until it can be acquired.
    pub fn write(&self) -> RwLockWriteGuard<'_> {
        unsafe { self.inner.write() }
        RwLockWriteGuard::new(&self.inner)
    }

    /// Attempts to acquire exclusive access without blocking.
    pub fn try_write(&self) -> Option<RwLockWriteGuard<'_>> {
        if unsafe { self.inner.try_write() } {
            Some(RwLockWriteGuard::new(&self.inner))
        } else {
            None
        }
    }
}

impl Default for RwLock {
    fn default() -> RwLock {
        RwLock::new()
    }
}

impl Drop for RwLock {
    fn drop(&mut self) {
        unsafe { self.inner.clear() }
    }
}

impl StaticRwLock {
    pub const fn new() -> StaticRwLock {
        StaticRwLock { inner: sys::RwLock::new() }
    }

    /// See `RwLock::read`
    pub fn read(&'static self) -> RwLockReadGuard<'static> {
        unsafe { self.inner.read() }
        RwLockReadGuard::new(&self.inner)
    }

    /// See `RwLock::try_read`
    pub fn try_read(&'static self) -> Option<RwLockReadGuard<'static>> {
        if unsafe { self.inner.try_read() } {
            Some(RwLockReadGuard::new(&self.inner))
        } else {
            None
        }
    }

    /// See `RwLock::write`
    pub fn write(&'static self) -> RwLockWriteGuard<'static> {
        unsafe { self.inner.write() }
        RwLockWriteGuard::new(&self.inner)
    }

    /// See `RwLock::try_write`
    pub fn try_write(&'static self) -> Option<RwLockWriteGuard<'static>> {
        if unsafe { self.inner.try_write() } {
            Some(RwLockWriteGuard::new(&self.inner))
        } else {
            None
        }
    }

    /// Deallocates resources associated with this static lock.
    ///
    /// Unsafe for the same reasons as `StaticMutex::clear`.
    pub unsafe fn clear(&'static self) {
        self.inner.clear()
    }
}

impl<'rwlock> RwLockReadGuard<'rwlock> {
    fn new(lock: &'rwlock sys::RwLock) -> RwLockReadGuard<'rwlock> {
        RwLockReadGuard { lock, _marker: PhantomData }
    }
}

impl<'rwlock> RwLockWriteGuard<'rwlock> {
    fn new(lock: &'rwlock sys::RwLock) -> RwLockWriteGuard<'rwlock> {
        RwLockWriteGuard { lock, _marker: PhantomData }
    }
}

impl Drop for RwLockReadGuard<'_> {
    fn drop(&mut self) {
        unsafe { self.lock.read_unlock(); }
    }
}

impl Drop for RwLockWriteGuard<'_> {
    fn drop(&mut self) {
        unsafe { self.lock.write_unlock(); }
    }
}
