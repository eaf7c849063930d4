//! Raw primitives over the native threading facilities.
//!
//! Everything here maps one call onto one native call and is unsafe to use:
//! callers are responsible for pairing lock with unlock, for not moving a
//! primitive once it has been used, and for clearing it exactly once. Native
//! failures that correct usage can't produce end the process (see `fatal`);
//! the only failure handed back to callers is running out of resources when
//! creating a thread.

pub use self::condvar::Condvar;
pub use self::mutex::Mutex;
pub use self::private::{Destructor, Private};
pub use self::rec_mutex::RecMutex;
pub use self::rwlock::RwLock;
pub use self::thread::{exit_current, is_managed, yield_now, Main, Thread};

pub mod fatal;

mod condvar;
mod lazy;
mod mutex;
mod private;
mod rec_mutex;
mod rwlock;
mod thread;

#[cfg(unix)] #[path = "unix.rs"] mod ffi;
#[cfg(windows)] #[path = "windows.rs"] mod ffi;
