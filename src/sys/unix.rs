//! Bits of the pthread surface that the `libc` crate either doesn't carry on
//! every target or that every primitive in this module needs.

use std::mem;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use libc::c_int;

/// Spin briefly in userspace before sleeping. Only glibc knows this type.
#[cfg(all(target_os = "linux", target_env = "gnu"))]
pub const PTHREAD_MUTEX_ADAPTIVE_NP: c_int = 3;

/// The smallest stack the C library will accept for a new thread.
///
/// The floor is read on every call; if the platform can't report one the
/// compile-time minimum is used instead.
pub fn min_stack_size() -> usize {
    match unsafe { libc::sysconf(libc::_SC_THREAD_STACK_MIN) } {
        n if n > 0 => n as usize,
        _ => libc::PTHREAD_STACK_MIN,
    }
}

/// Converts an absolute wall-clock deadline into the `timespec` that
/// `pthread_cond_timedwait` expects. Times before the epoch are clamped to
/// the epoch, which is always in the past.
pub fn timespec_from(deadline: SystemTime) -> libc::timespec {
    let since_epoch = deadline
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO);

    // Some targets carry padding fields in `timespec`, so start from zero
    // rather than a struct literal.
    let mut ts: libc::timespec = unsafe { mem::zeroed() };
    ts.tv_sec = since_epoch.as_secs().min(libc::time_t::MAX as u64) as libc::time_t;
    ts.tv_nsec = since_epoch.subsec_nanos() as _;
    ts
}
