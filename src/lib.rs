//! Mutexes, recursive mutexes, reader-writer locks, condition variables,
//! thread-local slots and threads, as thin layers over what the operating
//! system provides.
//!
//! The [`sys`] module is the raw layer: unsafe, address-sensitive, and free of
//! any dependency on the rest of a runtime, so it can be used while that
//! runtime is still starting up. The types at the top level wrap it in RAII
//! guards and owned handles.

pub use condvar::{Condvar, StaticCondvar};
pub use error::{ErrorKind, ThreadError};
pub use mutex::{Mutex, MutexGuard, StaticMutex};
pub use private::Private;
pub use rec_mutex::{RecMutex, RecMutexGuard, StaticRecMutex};
pub use rwlock::{RwLock, RwLockReadGuard, RwLockWriteGuard, StaticRwLock};
pub use thread::{current, exit_current, spawn, yield_now, Builder, JoinHandle, SystemThread};

pub mod sys;

mod condvar;
mod error;
mod mutex;
mod private;
mod rec_mutex;
mod rwlock;
mod thread;
