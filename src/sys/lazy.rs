//! Heap-allocated native state created on first use.
//!
//! Some native locks can't be statically initialized and must never move once
//! initialized, so they live behind a pointer that starts out null. The first
//! thread to need the state builds a candidate and tries to publish it with a
//! single compare-and-swap; a thread that loses the race tears its candidate
//! down without it ever having been visible to anyone else.

use std::marker::PhantomData;
use std::ptr;
use std::sync::atomic::AtomicPtr;
use std::sync::atomic::Ordering::{AcqRel, Acquire, Release};

pub trait LazyInit {
    /// Builds a fully initialized candidate.
    fn init() -> Box<Self>;

    /// Releases a candidate that lost the publication race.
    fn cancel_init(candidate: Box<Self>) {
        Self::destroy(candidate)
    }

    /// Releases state that was published.
    fn destroy(state: Box<Self>);
}

pub struct LazyBox<T: LazyInit> {
    ptr: AtomicPtr<T>,
    _marker: PhantomData<T>,
}

impl<T: LazyInit> LazyBox<T> {
    pub const fn new() -> LazyBox<T> {
        LazyBox { ptr: AtomicPtr::new(ptr::null_mut()), _marker: PhantomData }
    }

    /// Allocates right away. Only valid on a box nobody else can see yet.
    pub fn init_now(&self) {
        let state = Box::into_raw(T::init());
        let prev = self.ptr.swap(state, Release);
        debug_assert!(prev.is_null());
    }

    pub fn is_allocated(&self) -> bool {
        !self.ptr.load(Acquire).is_null()
    }

    #[inline]
    pub fn get(&self) -> &T {
        let state = self.ptr.load(Acquire);
        if state.is_null() {
            self.initialize()
        } else {
            unsafe { &*state }
        }
    }

    #[cold]
    fn initialize(&self) -> &T {
        let candidate = Box::into_raw(T::init());
        match self.ptr.compare_exchange(ptr::null_mut(), candidate, AcqRel, Acquire) {
            Ok(_) => unsafe { &*candidate },
            Err(winner) => {
                T::cancel_init(unsafe { Box::from_raw(candidate) });
                unsafe { &*winner }
            }
        }
    }

    /// Frees the state if it was ever allocated and returns to the
    /// unallocated state.
    ///
    /// Behavior is undefined if anyone is still using the state.
    pub unsafe fn clear(&self) {
        let state = self.ptr.swap(ptr::null_mut(), AcqRel);
        if !state.is_null() {
            T::destroy(Box::from_raw(state));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering::SeqCst;
    use std::sync::{Arc, Barrier};
    use std::thread;

    use super::{LazyBox, LazyInit};

    static BUILT: AtomicUsize = AtomicUsize::new(0);
    static CANCELLED: AtomicUsize = AtomicUsize::new(0);
    static DESTROYED: AtomicUsize = AtomicUsize::new(0);

    struct Counted(usize);

    impl LazyInit for Counted {
        fn init() -> Box<Counted> {
            Box::new(Counted(BUILT.fetch_add(1, SeqCst)))
        }
        fn cancel_init(candidate: Box<Counted>) {
            CANCELLED.fetch_add(1, SeqCst);
            drop(candidate);
        }
        fn destroy(state: Box<Counted>) {
            DESTROYED.fetch_add(1, SeqCst);
            drop(state);
        }
    }

    // All counters are shared, so everything runs inside one test.
    #[test]
    fn one_winner_and_losers_clean_up() {
        static NEVER_USED: LazyBox<Counted> = LazyBox::new();
        assert!(!NEVER_USED.is_allocated());
        unsafe { NEVER_USED.clear() }
        assert_eq!(DESTROYED.load(SeqCst), 0);

        static RACED: LazyBox<Counted> = LazyBox::new();
        const N: usize = 8;
        let barrier = Arc::new(Barrier::new(N));
        let seen: Vec<_> = (0..N)
            .map(|_| {
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    RACED.get() as *const Counted as usize
                })
            })
            .collect::<Vec<_>>()
            .into_iter()
            .map(|t| t.join().unwrap())
            .collect();

        assert!(seen.iter().all(|&p| p == seen[0]));
        assert_eq!(BUILT.load(SeqCst), CANCELLED.load(SeqCst) + 1);
        assert!(RACED.is_allocated());
        assert!(RACED.get().0 < BUILT.load(SeqCst));

        unsafe { RACED.clear() }
        assert!(!RACED.is_allocated());
        assert_eq!(DESTROYED.load(SeqCst), 1);
    }
}
