//! Copying the source data file into place.
//!
//! Policy: a snapshot copy is always tried first; if the whole retried
//! snapshot attempt fails, a retried direct copy is the fallback. The source
//! digest is computed after a successful copy.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use reseed_core::fs::{ensure_parent_dir, is_accessible};
use reseed_core::RetryPolicy;
use tracing::{error, info, warn};

use crate::digest::sha256_file;
use crate::error::{Result, TransferError};
use crate::snapshot::{Snapshot, SnapshotProvider};

pub const SNAPSHOT_COPY: &str = "VSS copy operation";
pub const FALLBACK_COPY: &str = "Fallback copy operation";
pub const FILE_HASH: &str = "File hash calculation";

/// Which path produced the copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyMethod {
    Snapshot,
    Direct,
}

impl fmt::Display for CopyMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CopyMethod::Snapshot => write!(f, "snapshot"),
            CopyMethod::Direct => write!(f, "direct"),
        }
    }
}

/// Outcome of a successful [`FileTransfer::transfer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReport {
    pub method: CopyMethod,
    pub bytes: u64,
    /// SHA-256 of the source file, lowercase hex.
    pub digest: String,
}

pub struct FileTransfer {
    snapshots: Arc<dyn SnapshotProvider>,
    retry: RetryPolicy,
    verify_copy: bool,
}

impl FileTransfer {
    pub fn new(snapshots: Arc<dyn SnapshotProvider>, retry: RetryPolicy) -> Self {
        Self {
            snapshots,
            retry,
            verify_copy: false,
        }
    }

    /// Also hash the destination and fail the transfer on a mismatch.
    pub fn with_verification(mut self, verify_copy: bool) -> Self {
        self.verify_copy = verify_copy;
        self
    }

    /// Copy `source` to `destination`, snapshot first, direct copy second.
    pub async fn transfer(&self, source: &Path, destination: &Path) -> Result<TransferReport> {
        let (method, bytes) = match self.snapshot_copy(source, destination).await {
            Ok(bytes) => (CopyMethod::Snapshot, bytes),
            Err(e) => {
                error!("Snapshot copy failed, falling back to direct copy: {e}");
                (CopyMethod::Direct, self.direct_copy(source, destination).await?)
            }
        };
        info!(
            "Copied {} to {} ({bytes} bytes, {method} copy)",
            source.display(),
            destination.display()
        );

        let digest = self.hash(source).await?;
        info!("Source file SHA-256: {digest}");

        if self.verify_copy {
            let actual = self.hash(destination).await?;
            if actual != digest {
                return Err(TransferError::DigestMismatch {
                    expected: digest,
                    actual,
                });
            }
            info!("Copy verified against source digest");
        }

        Ok(TransferReport {
            method,
            bytes,
            digest,
        })
    }

    /// Copy through a point-in-time snapshot of the source volume.
    pub async fn snapshot_copy(&self, source: &Path, destination: &Path) -> Result<u64> {
        if !self.snapshots.is_available() {
            return Err(TransferError::SnapshotCreationFailed(format!(
                "snapshot provider `{}` is not available",
                self.snapshots.name()
            )));
        }
        let bytes = self
            .retry
            .run(SNAPSHOT_COPY, move || self.snapshot_copy_once(source, destination))
            .await?;
        Ok(bytes)
    }

    /// Plain copy from the live source file.
    pub async fn direct_copy(&self, source: &Path, destination: &Path) -> Result<u64> {
        let bytes = self
            .retry
            .run(FALLBACK_COPY, move || direct_copy_once(source, destination))
            .await?;
        Ok(bytes)
    }

    /// SHA-256 of `path`, retried like any other read.
    pub async fn hash(&self, path: &Path) -> Result<String> {
        let digest = self.retry.run(FILE_HASH, move || sha256_file(path)).await?;
        Ok(digest)
    }

    async fn snapshot_copy_once(&self, source: &Path, destination: &Path) -> Result<u64> {
        ensure_accessible(source).await?;
        let source = std::path::absolute(source)?;
        let directory = source.parent().unwrap_or(source.as_path());

        let snapshot = self
            .snapshots
            .create(directory)
            .await?
            .ok_or_else(|| {
                TransferError::SnapshotCreationFailed("no snapshot path was produced".to_string())
            })?;

        let copied = copy_from_snapshot(&snapshot, &source, destination).await;

        // Best effort: a leftover snapshot does not fail the transfer.
        if let Err(e) = self.snapshots.destroy(&snapshot).await {
            warn!("Failed to delete snapshot {}: {e}", snapshot.id);
        }
        copied
    }
}

async fn copy_from_snapshot(snapshot: &Snapshot, source: &Path, destination: &Path) -> Result<u64> {
    let snapshot_path = snapshot.resolve(source).ok_or_else(|| {
        TransferError::SnapshotCreationFailed(format!(
            "{} is not inside snapshot of {}",
            source.display(),
            snapshot.volume.display()
        ))
    })?;
    ensure_parent_dir(destination).await?;
    Ok(tokio::fs::copy(&snapshot_path, destination).await?)
}

async fn direct_copy_once(source: &Path, destination: &Path) -> Result<u64> {
    ensure_accessible(source).await?;
    ensure_parent_dir(destination).await?;
    Ok(tokio::fs::copy(source, destination).await?)
}

async fn ensure_accessible(source: &Path) -> Result<()> {
    if is_accessible(source).await {
        Ok(())
    } else {
        Err(TransferError::SourceInaccessible {
            path: source.to_path_buf(),
        })
    }
}
