use std::marker::PhantomData;
use std::ptr;

use libc::c_void;

use crate::sys;

/// A thread-local slot holding at most one `T` per thread.
///
/// Each thread starts out with an empty slot. A value left in the slot when
/// its thread exits is dropped on that thread. Dropping the `Private` itself
/// drops the calling thread's value. What happens to values other threads
/// still hold at that point is up to the platform: they are leaked on Unix
/// and dropped by the freeing thread on Windows.
///
/// # Example
///
/// ```rust
/// use std::thread;
/// use native_sync::Private;
///
/// let slot = Private::new();
/// slot.replace(Some(1));
///
/// thread::scope(|s| {
///     s.spawn(|| assert_eq!(slot.get(), None));
/// });
/// assert_eq!(slot.take(), Some(1));
/// ```
pub struct Private<T: Send + 'static> {
    inner: sys::Private,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Send + 'static> Private<T> {
    pub fn new() -> Private<T> {
        let inner = sys::Private::new();
        inner.init(Some(drop_boxed::<T>));
        Private { inner, _marker: PhantomData }
    }

    /// Stores `value` for the calling thread and returns what was there.
    pub fn replace(&self, value: Option<T>) -> Option<T> {
        let new = match value {
            Some(value) => Box::into_raw(Box::new(value)) as *mut c_void,
            None => ptr::null_mut(),
        };
        let old = self.inner.get();
        self.inner.set(new);
        if old.is_null() {
            None
        } else {
            Some(*unsafe { Box::from_raw(old as *mut T) })
        }
    }

    /// Empties the calling thread's slot.
    pub fn take(&self) -> Option<T> {
        self.replace(None)
    }
}

impl<T: Copy + Send + 'static> Private<T> {
    /// Returns a copy of the calling thread's value.
    pub fn get(&self) -> Option<T> {
        let value = self.inner.get() as *const T;
        if value.is_null() {
            None
        } else {
            Some(unsafe { *value })
        }
    }
}

impl<T: Send + 'static> Default for Private<T> {
    fn default() -> Private<T> {
        Private::new()
    }
}

impl<T: Send + 'static> Drop for Private<T> {
    fn drop(&mut self) {
        drop(self.take());
        unsafe { self.inner.clear() }
    }
}

#[cfg(unix)]
unsafe extern "C" fn drop_boxed<T>(value: *mut c_void) {
    drop(Box::from_raw(value as *mut T));
}

#[cfg(windows)]
unsafe extern "system" fn drop_boxed<T>(value: *mut c_void) {
    drop(Box::from_raw(value as *mut T));
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering::SeqCst;
    use std::sync::Arc;
    use std::thread;

    use super::Private;

    #[test]
    fn values_are_per_thread() {
        let slot = Arc::new(Private::<u32>::new());
        assert_eq!(slot.get(), None);
        assert_eq!(slot.replace(Some(1)), None);

        let threads: Vec<_> = (2..5)
            .map(|n| {
                let slot = slot.clone();
                thread::spawn(move || {
                    assert_eq!(slot.get(), None);
                    slot.replace(Some(n));
                    thread::yield_now();
                    assert_eq!(slot.get(), Some(n));
                    slot.take()
                })
            })
            .collect();
        for (n, t) in (2..5).zip(threads) {
            assert_eq!(t.join().unwrap(), Some(n));
        }

        assert_eq!(slot.get(), Some(1));
        assert_eq!(slot.replace(Some(9)), Some(1));
        assert_eq!(slot.take(), Some(9));
        assert_eq!(slot.get(), None);
    }

    struct Counted(Arc<AtomicUsize>);

    impl Drop for Counted {
        fn drop(&mut self) {
            self.0.fetch_add(1, SeqCst);
        }
    }

    #[test]
    fn leftover_value_dropped_at_thread_exit() {
        let drops = Arc::new(AtomicUsize::new(0));
        let slot = Arc::new(Private::<Counted>::new());

        let (slot2, drops2) = (slot.clone(), drops.clone());
        thread::spawn(move || {
            slot2.replace(Some(Counted(drops2)));
        })
        .join()
        .unwrap();
        assert_eq!(drops.load(SeqCst), 1);

        // Values handed back by `replace` belong to the caller.
        slot.replace(Some(Counted(drops.clone())));
        let old = slot.replace(Some(Counted(drops.clone())));
        assert_eq!(drops.load(SeqCst), 1);
        drop(old);
        assert_eq!(drops.load(SeqCst), 2);

        // Dropping the slot drops this thread's value.
        drop(slot);
        assert_eq!(drops.load(SeqCst), 3);
    }
}
