use std::marker::PhantomData;

use crate::sys;

/// A mutual exclusion primitive useful for protecting shared data
///
/// This mutex will properly block threads waiting for the lock to become
/// available. The mutex can also be statically initialized or created via a
/// `new` constructor. It does not own the data it protects; which data a
/// given mutex guards is a convention between its users.
///
/// # Example
///
/// ```rust
/// use native_sync::Mutex;
///
/// let m = Mutex::new();
/// let guard = m.lock();
/// // do some work
/// drop(guard); // unlock the lock
/// ```
pub struct Mutex {
    // Note that this mutex is in a *box*, not inlined into the struct itself.
    // Once a native mutex has been used once, its address can never change
    // (it can't be moved). This mutex type can be safely moved at any time,
    // so to ensure that the native mutex is used correctly we box the inner
    // lock to give it a constant address.
    lock: Box<sys::Mutex>,
}

/// The static mutex type is provided to allow for static allocation of mutexes.
///
/// Note that this is a separate type because using a Mutex correctly means that
/// it needs to have a destructor run. In Rust, statics are not allowed to have
/// destructors. As a result, a `StaticMutex` has one extra method when compared
/// to a `Mutex`, a `clear` method. This method is unsafe to call, and
/// documentation can be found directly on the method.
///
/// # Example
///
/// ```rust
/// use native_sync::StaticMutex;
///
/// static LOCK: StaticMutex = StaticMutex::new();
///
/// {
///     let _g = LOCK.lock();
///     // do some productive work
/// }
/// // lock is unlocked here.
/// ```
pub struct StaticMutex {
    lock: sys::Mutex,
}

/// An RAII implementation of a "scoped lock" of a mutex. When this structure is
/// dropped (falls out of scope), the lock will be unlocked.
#[must_use]
pub struct MutexGuard<'a> {
    lock: &'a sys::Mutex,
    // Must be released by the thread that acquired it.
    _marker: PhantomData<*const ()>,
}

impl Mutex {
    /// Creates a new mutex in an unlocked state ready for use.
    pub fn new() -> Mutex {
        let lock = Box::new(sys::Mutex::new());
        unsafe { lock.init() }
        Mutex { lock }
    }

    /// Acquires a mutex, blocking the current thread until it is able to do so.
    ///
    /// This function will block the local thread until it is available to
    /// acquire the mutex. Upon returning, the thread is the only thread with
    /// the mutex held. An RAII guard is returned to allow scoped unlock of the
    /// lock. When the guard goes out of scope, the mutex will be unlocked.
    ///
    /// Locking a mutex the current thread already holds may deadlock; use
    /// `RecMutex` for that.
    pub fn lock(&self) -> MutexGuard<'_> {
        unsafe { self.lock.lock() }
        MutexGuard::new(&self.lock)
    }

    /// Attempts to acquire this lock.
    ///
    /// If the lock could not be acquired at this time, then `None` is returned.
    /// Otherwise, an RAII guard is returned. The lock will be unlocked when the
    /// guard is dropped.
    ///
    /// This function does not block.
    pub fn try_lock(&self) -> Option<MutexGuard<'_>> {
        if unsafe { self.lock.try_lock() } {
            Some(MutexGuard::new(&self.lock))
        } else {
            None
        }
    }
}

impl Default for Mutex {
    fn default() -> Mutex {
        Mutex::new()
    }
}

impl Drop for Mutex {
    fn drop(&mut self) {
        // This is actually safe b/c we know that there is no further usage of
        // this mutex (it's up to the user to arrange for a mutex to get
        // dropped, that's not our job)
        unsafe { self.lock.clear() }
    }
}

impl StaticMutex {
    /// Creates a mutex usable without any further initialization.
    pub const fn new() -> StaticMutex {
        StaticMutex { lock: sys::Mutex::new() }
    }

    /// Acquires this lock, see `Mutex::lock`
    pub fn lock(&'static self) -> MutexGuard<'static> {
        unsafe { self.lock.lock() }
        MutexGuard::new(&self.lock)
    }

    /// Attempts to grab this lock, see `Mutex::try_lock`
    pub fn try_lock(&'static self) -> Option<MutexGuard<'static>> {
        if unsafe { self.lock.try_lock() } {
            Some(MutexGuard::new(&self.lock))
        } else {
            None
        }
    }

    /// Deallocates resources associated with this static mutex.
    ///
    /// This method is unsafe because it provides no guarantees that there are
    /// no active users of this mutex, and safety is not guaranteed if there are
    /// active users of this mutex.
    ///
    /// This method is required to ensure that there are no memory leaks on
    /// *all* platforms. It may be the case that some platforms do not leak
    /// memory if this method is not called, but this is not guaranteed to be
    /// true on all platforms.
    pub unsafe fn clear(&'static self) {
        self.lock.clear()
    }
}

pub(crate) fn guard_inner<'a>(guard: &MutexGuard<'a>) -> &'a sys::Mutex { guard.lock }

impl<'mutex> MutexGuard<'mutex> {
    fn new(lock: &'mutex sys::Mutex) -> MutexGuard<'mutex> {
        MutexGuard { lock, _marker: PhantomData }
    }
}

impl Drop for MutexGuard<'_> {
    fn drop(&mut self) {
        unsafe { self.lock.unlock(); }
    }
}
