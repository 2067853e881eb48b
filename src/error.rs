//! Error type for the recoverable failures of the library.
//!
//! Contract violations (mismatched lengths, misaligned buffers handed to an
//! aligned-only kernel, integer division by zero) are programming defects and
//! panic instead of surfacing here.

use thiserror::Error;

/// Errors reported to callers.
#[derive(Error, Debug)]
pub enum LaneError {
    /// The allocator could not satisfy the request.
    #[error("allocation of {bytes} bytes aligned to {align} failed")]
    Alloc { bytes: usize, align: usize },

    /// The requested element count and alignment do not form a valid layout.
    #[error("invalid layout: {count} elements aligned to {align} bytes")]
    Layout { count: usize, align: usize },

    /// Scalar and vector paths disagreed during a harness check.
    #[error("{kernel}: lane {lane} differs ({detail})")]
    Mismatch {
        kernel: String,
        lane: usize,
        detail: String,
    },

    /// The configuration file could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// The configuration file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
