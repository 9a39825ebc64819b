//! Point-in-time snapshot capability used by the snapshot copy.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use reseed_core::config::{SnapshotConfig, SnapshotProviderKind};

use crate::command::CommandSnapshotProvider;
use crate::error::Result;
use crate::vss::ShadowCopyProvider;

/// A live snapshot: files under `volume` are readable under `root`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Provider-specific identifier used to destroy the snapshot.
    pub id: String,
    /// Path prefix the snapshot was taken of.
    pub volume: PathBuf,
    /// Where that prefix is exposed inside the snapshot.
    pub root: PathBuf,
}

impl Snapshot {
    /// Map `source` onto its path inside the snapshot.
    ///
    /// Returns `None` when `source` is not under the snapshotted volume.
    pub fn resolve(&self, source: &Path) -> Option<PathBuf> {
        let relative = source.strip_prefix(&self.volume).ok()?;
        Some(self.root.join(relative))
    }
}

/// Creates and destroys point-in-time snapshots of a directory's volume.
#[async_trait]
pub trait SnapshotProvider: Send + Sync {
    fn name(&self) -> &str;

    /// False when no snapshot facility is configured; callers skip straight
    /// to the direct copy.
    fn is_available(&self) -> bool {
        true
    }

    /// Snapshot the volume holding `directory_hint`. `Ok(None)` means the
    /// facility ran but produced no usable snapshot.
    async fn create(&self, directory_hint: &Path) -> Result<Option<Snapshot>>;

    async fn destroy(&self, snapshot: &Snapshot) -> Result<()>;
}

/// Provider for hosts without a snapshot facility.
#[derive(Debug, Default)]
pub struct DisabledSnapshots;

#[async_trait]
impl SnapshotProvider for DisabledSnapshots {
    fn name(&self) -> &str {
        "none"
    }

    fn is_available(&self) -> bool {
        false
    }

    async fn create(&self, _directory_hint: &Path) -> Result<Option<Snapshot>> {
        Ok(None)
    }

    async fn destroy(&self, _snapshot: &Snapshot) -> Result<()> {
        Ok(())
    }
}

/// Root of the volume containing `path` (`C:\`, `\\server\share\`, `/`).
///
/// Empty for relative paths.
pub fn volume_root(path: &Path) -> PathBuf {
    path.components()
        .take_while(|c| matches!(c, Component::Prefix(_) | Component::RootDir))
        .collect()
}

/// Build the provider selected by `config.provider`.
pub fn build_provider(config: &SnapshotConfig) -> Arc<dyn SnapshotProvider> {
    match config.provider {
        SnapshotProviderKind::Vss => Arc::new(ShadowCopyProvider::new(config.timeout())),
        SnapshotProviderKind::Command => Arc::new(CommandSnapshotProvider::new(
            config.create_command.clone().unwrap_or_default(),
            config.destroy_command.clone(),
            config.timeout(),
        )),
        SnapshotProviderKind::None => Arc::new(DisabledSnapshots),
    }
}
