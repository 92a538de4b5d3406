//! Fatal conditions that change how the process exits
//!
//! Most failures travel as plain `anyhow::Error` with context attached. The
//! variants here are the ones `main` (and the tests) need to tell apart, so
//! they are raised as a typed error and recovered with `downcast_ref`.

use std::path::PathBuf;
use thiserror::Error;

/// Exit status for a target whose size resolves to zero.
///
/// The original tool exited with -1, which the OS reports as 255.
pub const EXIT_ZERO_SIZE: u8 = 255;

/// Exit status for every other fatal error.
pub const EXIT_FAILURE: u8 = 1;

/// Typed fatal errors
#[derive(Debug, Error)]
pub enum BenchError {
    /// No target path on the command line
    #[error("no file given!")]
    NoTarget,

    /// Neither metadata nor the block device query produced a size
    #[error("{path}: metadata and block device query both reported 0 bytes")]
    ZeroSize { path: PathBuf },

    /// Target is too small to hold a single random offset
    #[error("target is {size} bytes, at least 2 bytes are needed for random offsets")]
    TargetTooSmall { size: u64 },

    /// A positioned read failed during the random read phase
    #[error("worker {worker}: read of {len} bytes at offset {offset} failed")]
    Read {
        worker: usize,
        offset: u64,
        len: usize,
        #[source]
        source: std::io::Error,
    },

    /// A worker thread panicked before reporting its timing
    #[error("worker {worker} panicked")]
    WorkerPanicked { worker: usize },
}

impl BenchError {
    /// Process exit status for this error
    pub fn exit_code(&self) -> u8 {
        match self {
            BenchError::ZeroSize { .. } => EXIT_ZERO_SIZE,
            _ => EXIT_FAILURE,
        }
    }
}

/// Exit status for any error surfaced from a run
pub fn exit_code_for(err: &anyhow::Error) -> u8 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<BenchError>())
        .map_or(EXIT_FAILURE, BenchError::exit_code)
}
