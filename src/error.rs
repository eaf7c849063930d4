use std::io;

use thiserror::Error;

/// The conditions a caller of this crate is expected to branch on.
///
/// Lock contention and condition-wait timeouts are reported as `false`, not as
/// errors, so thread creation is the only fallible operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The system could not provide another thread right now. Retrying later,
    /// shedding load or running the work inline are all reasonable responses.
    ResourceExhausted,
}

/// Why a thread could not be created.
#[derive(Debug, Error)]
pub enum ThreadError {
    #[error("error creating thread: {source}")]
    ResourceExhausted {
        #[source]
        source: io::Error,
    },
}

impl ThreadError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ThreadError::ResourceExhausted { .. } => ErrorKind::ResourceExhausted,
        }
    }
}
