use std::ptr;
use std::sync::atomic::AtomicPtr;
use std::sync::atomic::Ordering::SeqCst;
use std::time::{Duration, SystemTime};

use crate::mutex::{self, MutexGuard};
use crate::sys;

/// A condition variable.
///
/// Threads park on a condition variable while holding a mutex, which is
/// released for the duration of the wait and held again on return. Wake-ups
/// may be spurious, so waiters should re-check their predicate in a loop.
///
/// A condition variable may only ever be used with one mutex; waiting with a
/// guard of a second mutex panics.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use std::thread;
/// use native_sync::{Condvar, Mutex};
///
/// let pair = Arc::new((Mutex::new(), Condvar::new(), AtomicBool::new(false)));
/// let pair2 = pair.clone();
///
/// thread::spawn(move || {
///     let (lock, cvar, started) = &*pair2;
///     let _g = lock.lock();
///     started.store(true, Ordering::SeqCst);
///     cvar.signal();
/// });
///
/// let (lock, cvar, started) = &*pair;
/// let g = lock.lock();
/// while !started.load(Ordering::SeqCst) {
///     cvar.wait(&g);
/// }
/// ```
pub struct Condvar {
    inner: Box<sys::Condvar>,
    mutex: AtomicPtr<sys::Mutex>,
}

/// A condition variable usable as a `static`.
pub struct StaticCondvar {
    inner: sys::Condvar,
    mutex: AtomicPtr<sys::Mutex>,
}

impl Condvar {
    pub fn new() -> Condvar {
        let inner = Box::new(sys::Condvar::new());
        unsafe { inner.init() }
        Condvar { inner, mutex: AtomicPtr::new(ptr::null_mut()) }
    }

    /// Blocks until this condition variable is signaled.
    ///
    /// The mutex behind `guard` is released while waiting and re-acquired
    /// before this returns.
    ///
    /// # Panics
    ///
    /// Panics if this condition variable was previously used with a
    /// different mutex.
    pub fn wait(&self, guard: &MutexGuard<'_>) {
        unsafe { self.inner.wait(verify(&self.mutex, guard)) }
    }

    /// Like `wait`, but gives up once the wall clock passes `deadline`.
    ///
    /// Returns `false` if the deadline passed, `true` if the thread was
    /// woken (possibly spuriously). Either way the mutex is held again on
    /// return.
    pub fn wait_until(&self, guard: &MutexGuard<'_>, deadline: SystemTime) -> bool {
        unsafe { self.inner.wait_until(verify(&self.mutex, guard), Some(deadline)) }
    }

    /// Like `wait_until` with a deadline `dur` from now.
    pub fn wait_timeout(&self, guard: &MutexGuard<'_>, dur: Duration) -> bool {
        unsafe { self.inner.wait_timeout(verify(&self.mutex, guard), dur) }
    }

    /// Wakes up one blocked thread, if any.
    pub fn signal(&self) { unsafe { self.inner.signal() } }

    /// Wakes up all blocked threads.
    pub fn broadcast(&self) { unsafe { self.inner.broadcast() } }
}

impl Default for Condvar {
    fn default() -> Condvar {
        Condvar::new()
    }
}

impl Drop for Condvar {
    fn drop(&mut self) {
        unsafe { self.inner.clear() }
    }
}

impl StaticCondvar {
    pub const fn new() -> StaticCondvar {
        StaticCondvar {
            inner: sys::Condvar::new(),
            mutex: AtomicPtr::new(ptr::null_mut()),
        }
    }

    /// See `Condvar::wait`
    pub fn wait(&'static self, guard: &MutexGuard<'_>) {
        unsafe { self.inner.wait(verify(&self.mutex, guard)) }
    }

    /// See `Condvar::wait_until`
    pub fn wait_until(&'static self, guard: &MutexGuard<'_>, deadline: SystemTime) -> bool {
        unsafe { self.inner.wait_until(verify(&self.mutex, guard), Some(deadline)) }
    }

    /// See `Condvar::wait_timeout`
    pub fn wait_timeout(&'static self, guard: &MutexGuard<'_>, dur: Duration) -> bool {
        unsafe { self.inner.wait_timeout(verify(&self.mutex, guard), dur) }
    }

    pub fn signal(&'static self) { unsafe { self.inner.signal() } }

    pub fn broadcast(&'static self) { unsafe { self.inner.broadcast() } }

    /// Deallocates resources associated with this static condition variable
    /// and forgets which mutex it was used with.
    ///
    /// Unsafe for the same reasons as `StaticMutex::clear`.
    pub unsafe fn clear(&'static self) {
        self.inner.clear();
        self.mutex.store(ptr::null_mut(), SeqCst);
    }
}

// Binds the condition variable to the guard's mutex on first use.
fn verify<'a>(bound: &AtomicPtr<sys::Mutex>, guard: &MutexGuard<'a>) -> &'a sys::Mutex {
    let lock = mutex::guard_inner(guard);
    let addr = lock as *const sys::Mutex as *mut sys::Mutex;
    match bound.compare_exchange(ptr::null_mut(), addr, SeqCst, SeqCst) {
        Ok(_) => {}
        Err(prev) if prev == addr => {}
        Err(_) => panic!("attempted to use a condition variable with two mutexes"),
    }
    lock
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering::SeqCst;
    use std::sync::atomic::{AtomicBool, AtomicUsize};
    use std::sync::mpsc::channel;
    use std::sync::Arc;
    use std::thread;
    use std::time::{Duration, SystemTime};

    use super::{Condvar, StaticCondvar};
    use crate::mutex::{Mutex, StaticMutex};

    #[test]
    fn smoke() {
        let c = Condvar::new();
        c.signal();
        c.broadcast();
    }

    #[test]
    fn static_smoke() {
        static C: StaticCondvar = StaticCondvar::new();
        C.signal();
        C.broadcast();
        unsafe { C.clear(); }
    }

    #[test]
    fn signal() {
        static C: StaticCondvar = StaticCondvar::new();
        static M: StaticMutex = StaticMutex::new();
        static READY: AtomicBool = AtomicBool::new(false);

        let g = M.lock();
        thread::spawn(|| {
            let _g = M.lock();
            READY.store(true, SeqCst);
            C.signal();
        });
        while !READY.load(SeqCst) {
            C.wait(&g);
        }
        drop(g);
    }

    #[test]
    fn broadcast_wakes_every_waiter() {
        const N: usize = 2;
        let shared = Arc::new((Mutex::new(), Condvar::new(), AtomicBool::new(false)));
        let parked = Arc::new(AtomicUsize::new(0));

        let threads: Vec<_> = (0..N)
            .map(|_| {
                let (shared, parked) = (shared.clone(), parked.clone());
                thread::spawn(move || {
                    let (lock, cvar, go) = &*shared;
                    let g = lock.lock();
                    parked.fetch_add(1, SeqCst);
                    while !go.load(SeqCst) {
                        cvar.wait(&g);
                    }
                })
            })
            .collect();

        while parked.load(SeqCst) < N {
            thread::yield_now();
        }
        {
            let (lock, cvar, go) = &*shared;
            let _g = lock.lock();
            go.store(true, SeqCst);
            cvar.broadcast();
        }
        for t in threads {
            t.join().unwrap();
        }
    }

    #[test]
    fn signal_wakes_one_of_two_waiters() {
        let shared = Arc::new((Mutex::new(), Condvar::new(), AtomicUsize::new(0)));
        let parked = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = channel();

        let threads: Vec<_> = (0..2)
            .map(|id| {
                let (shared, parked, tx) = (shared.clone(), parked.clone(), tx.clone());
                thread::spawn(move || {
                    let (lock, cvar, tokens) = &*shared;
                    let g = lock.lock();
                    parked.fetch_add(1, SeqCst);
                    while tokens.load(SeqCst) == 0 {
                        cvar.wait(&g);
                    }
                    tokens.fetch_sub(1, SeqCst);
                    drop(g);
                    tx.send(id).unwrap();
                })
            })
            .collect();

        let (lock, cvar, tokens) = &*shared;
        // Both are parked once the count reaches two under the lock.
        while {
            let _g = lock.lock();
            parked.load(SeqCst) < 2
        } {
            thread::yield_now();
        }
        {
            let _g = lock.lock();
            tokens.store(1, SeqCst);
            cvar.signal();
        }
        let first = rx.recv_timeout(Duration::from_secs(10)).unwrap();
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());

        {
            let _g = lock.lock();
            tokens.fetch_add(1, SeqCst);
            cvar.broadcast();
        }
        let second = rx.recv_timeout(Duration::from_secs(10)).unwrap();
        assert_ne!(first, second);
        for t in threads {
            t.join().unwrap();
        }
    }

    #[test]
    fn wait_timeout() {
        static C: StaticCondvar = StaticCondvar::new();
        static M: StaticMutex = StaticMutex::new();
        static READY: AtomicBool = AtomicBool::new(false);

        let g = M.lock();
        assert!(!C.wait_timeout(&g, Duration::from_micros(1)));
        assert!(!C.wait_until(&g, SystemTime::now() - Duration::from_secs(1)));

        thread::spawn(|| {
            let _g = M.lock();
            READY.store(true, SeqCst);
            C.signal();
        });
        while !READY.load(SeqCst) {
            assert!(C.wait_timeout(&g, Duration::from_secs(86_400)));
        }
        drop(g);
    }

    #[test]
    fn timeout_takes_at_least_the_duration() {
        let m = Mutex::new();
        let c = Condvar::new();
        let g = m.lock();
        let start = SystemTime::now();
        let dur = Duration::from_millis(20);
        while c.wait_timeout(&g, dur) {}
        assert!(start.elapsed().unwrap() >= dur);
    }

    #[test]
    #[should_panic(expected = "attempted to use a condition variable with two mutexes")]
    fn two_mutexes() {
        let m1 = Mutex::new();
        let m2 = Mutex::new();
        let c = Condvar::new();

        let g = m1.lock();
        c.wait_timeout(&g, Duration::from_millis(1));
        drop(g);

        let g = m2.lock();
        c.wait_timeout(&g, Duration::from_millis(1));
    }
}
