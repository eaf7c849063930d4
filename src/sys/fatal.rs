//! The abort path shared by every primitive in this module.
//!
//! Nothing below the safe wrappers can report a structured error, so a status
//! from the C library that correct usage never produces ends the process here
//! instead of being handed back to a caller that could not interpret it.

use std::io::{self, Write};
use std::process;

/// Prints which native call failed along with the OS description of
/// `status`, then aborts.
#[cold]
#[inline(never)]
pub fn abort(status: i32, function: &str) -> ! {
    let err = io::Error::from_raw_os_error(status);
    let _ = writeln!(
        io::stderr(),
        "native-sync: unexpected error from C library during '{}': {}.  Aborting.",
        function, err
    );
    process::abort()
}

/// Aborts for a failure that has no native status attached.
#[cold]
#[inline(never)]
pub fn abort_with(what: &str) -> ! {
    let _ = writeln!(io::stderr(), "native-sync: {}.  Aborting.", what);
    process::abort()
}

/// Aborts unless a pthread-style return code reports success.
#[inline]
pub fn check(status: i32, function: &str) {
    if status != 0 {
        abort(status, function)
    }
}
