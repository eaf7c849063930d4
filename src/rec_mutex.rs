use std::marker::PhantomData;

use crate::sys;

/// A mutex that the thread holding it may lock again.
///
/// Each successful `lock` or `try_lock` returns a guard, and the mutex only
/// becomes available to other threads once every guard has been dropped.
///
/// The native lock lives on the heap and is only created when the mutex is
/// first used, so this type can be moved freely.
///
/// # Example
///
/// ```rust
/// use native_sync::RecMutex;
///
/// let m = RecMutex::new();
/// let outer = m.lock();
/// let inner = m.lock(); // same thread, doesn't block
/// drop(inner);
/// drop(outer);
/// ```
pub struct RecMutex {
    lock: sys::RecMutex,
}

/// A recursive mutex for `static` items; its native state is created lazily,
/// the first time it is locked.
pub struct StaticRecMutex {
    lock: sys::RecMutex,
}

/// Releases one level of ownership of a recursive mutex when dropped.
#[must_use]
pub struct RecMutexGuard<'a> {
    lock: &'a sys::RecMutex,
    _marker: PhantomData<*const ()>,
}

impl RecMutex {
    /// Creates a new recursive mutex, allocating its native state right away.
    pub fn new() -> RecMutex {
        let lock = sys::RecMutex::new();
        unsafe { lock.init() }
        RecMutex { lock }
    }

    /// Acquires the mutex, blocking unless it is free or already held by the
    /// current thread.
    pub fn lock(&self) -> RecMutexGuard<'_> {
        unsafe { self.lock.lock() }
        RecMutexGuard::new(&self.lock)
    }

    /// Attempts to acquire the mutex without blocking. This only fails when
    /// another thread holds it.
    pub fn try_lock(&self) -> Option<RecMutexGuard<'_>> {
        if unsafe { self.lock.try_lock() } {
            Some(RecMutexGuard::new(&self.lock))
        } else {
            None
        }
    }
}

impl Default for RecMutex {
    fn default() -> RecMutex {
        RecMutex::new()
    }
}

impl Drop for RecMutex {
    fn drop(&mut self) {
        unsafe { self.lock.clear() }
    }
}

impl StaticRecMutex {
    pub const fn new() -> StaticRecMutex {
        StaticRecMutex { lock: sys::RecMutex::new() }
    }

    /// Acquires this lock, see `RecMutex::lock`
    pub fn lock(&'static self) -> RecMutexGuard<'static> {
        unsafe { self.lock.lock() }
        RecMutexGuard::new(&self.lock)
    }

    /// Attempts to grab this lock, see `RecMutex::try_lock`
    pub fn try_lock(&'static self) -> Option<RecMutexGuard<'static>> {
        if unsafe { self.lock.try_lock() } {
            Some(RecMutexGuard::new(&self.lock))
        } else {
            None
        }
    }

    /// Frees the native state, if the mutex was ever used.
    ///
    /// The mutex may be used again afterwards, in which case fresh state is
    /// allocated. Behavior is undefined if any thread holds or is waiting for
    /// the mutex.
    pub unsafe fn clear(&'static self) {
        self.lock.clear()
    }
}

impl<'a> RecMutexGuard<'a> {
    fn new(lock: &'a sys::RecMutex) -> RecMutexGuard<'a> {
        RecMutexGuard { lock, _marker: PhantomData }
    }
}

impl Drop for RecMutexGuard<'_> {
    fn drop(&mut self) {
        unsafe { self.lock.unlock() }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc::channel;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use super::{RecMutex, StaticRecMutex};

    #[test]
    fn smoke() {
        let m = RecMutex::new();
        let a = m.lock();
        let b = m.lock();
        let c = m.try_lock();
        assert!(c.is_some());
        drop((c, b, a));
        drop(m.lock());
    }

    #[test]
    fn static_needs_no_setup() {
        static M: StaticRecMutex = StaticRecMutex::new();
        {
            let _a = M.lock();
            let _b = M.lock();
        }
        unsafe { M.clear() }
        // Usable again after a clear.
        drop(M.lock());
        unsafe { M.clear() }
    }

    #[test]
    fn lots_and_lots() {
        static M: StaticRecMutex = StaticRecMutex::new();
        static mut CNT: u32 = 0;
        const J: u32 = 1000;
        const K: u32 = 4;

        let threads: Vec<_> = (0..K)
            .map(|_| {
                thread::spawn(|| {
                    for _ in 0..J {
                        let _outer = M.lock();
                        let _inner = M.lock();
                        unsafe { CNT += 1; }
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }
        let _g = M.lock();
        assert_eq!(unsafe { CNT }, J * K);
    }

    #[test]
    fn partial_release_keeps_others_out() {
        let m = Arc::new(RecMutex::new());
        let outer = m.lock();
        let inner = m.lock();
        drop(inner);

        let (tx, rx) = channel();
        let m2 = m.clone();
        let t = thread::spawn(move || {
            assert!(m2.try_lock().is_none());
            let _g = m2.lock();
            tx.send(()).unwrap();
        });

        // Still held once, so the other thread stays blocked.
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
        drop(outer);
        rx.recv().unwrap();
        t.join().unwrap();
    }
}
