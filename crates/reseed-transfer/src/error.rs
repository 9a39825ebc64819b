//! Error types for the reseed-transfer crate.

use std::path::PathBuf;

use reseed_core::RetryExhausted;
use thiserror::Error;

/// All errors that can originate from copying or hashing the data file.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The source file failed the readability probe.
    #[error("Source file is not accessible: {}", path.display())]
    SourceInaccessible { path: PathBuf },

    /// The snapshot facility did not produce a usable snapshot path.
    #[error("Snapshot creation failed: {0}")]
    SnapshotCreationFailed(String),

    /// An external snapshot command exited unsuccessfully or could not start.
    #[error("Snapshot command failed: {0}")]
    Command(String),

    /// An external snapshot command exceeded its deadline and was killed.
    #[error("Snapshot command timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The copy does not hash to the same digest as the source.
    #[error("Copy verification failed: source digest {expected}, copy digest {actual}")]
    DigestMismatch { expected: String, actual: String },

    /// Underlying I/O failure (open, copy, read, mkdir).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A retried step gave up.
    #[error(transparent)]
    Retry(#[from] RetryExhausted),
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, TransferError>;
