//! Snapshot provider driven by operator-supplied shell commands.
//!
//! The create command runs with `RESEED_SNAPSHOT_DIR` set to the directory
//! being snapshotted and must print, as its first non-empty stdout line, the
//! path where that directory is visible inside the snapshot. The optional
//! destroy command runs with `RESEED_SNAPSHOT_PATH` set to that path.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use crate::error::Result;
use crate::process;
use crate::snapshot::{Snapshot, SnapshotProvider};

pub const SNAPSHOT_DIR_ENV: &str = "RESEED_SNAPSHOT_DIR";
pub const SNAPSHOT_PATH_ENV: &str = "RESEED_SNAPSHOT_PATH";

pub struct CommandSnapshotProvider {
    create_command: String,
    destroy_command: Option<String>,
    timeout: Duration,
}

impl CommandSnapshotProvider {
    pub fn new(create_command: String, destroy_command: Option<String>, timeout: Duration) -> Self {
        Self {
            create_command,
            destroy_command,
            timeout,
        }
    }
}

#[async_trait]
impl SnapshotProvider for CommandSnapshotProvider {
    fn name(&self) -> &str {
        "command"
    }

    async fn create(&self, directory_hint: &Path) -> Result<Option<Snapshot>> {
        let mut cmd = process::shell(&self.create_command);
        cmd.env(SNAPSHOT_DIR_ENV, directory_hint);
        let output = process::run(cmd, self.timeout)
            .await?
            .into_checked("snapshot create command")?;

        let Some(path) = output.stdout.lines().map(str::trim).find(|l| !l.is_empty()) else {
            return Ok(None);
        };
        info!("Snapshot of {} available at {path}", directory_hint.display());
        Ok(Some(Snapshot {
            id: path.to_string(),
            volume: directory_hint.to_path_buf(),
            root: PathBuf::from(path),
        }))
    }

    async fn destroy(&self, snapshot: &Snapshot) -> Result<()> {
        let Some(ref script) = self.destroy_command else {
            return Ok(());
        };
        let mut cmd = process::shell(script);
        cmd.env(SNAPSHOT_PATH_ENV, &snapshot.root);
        process::run(cmd, self.timeout)
            .await?
            .into_checked("snapshot destroy command")?;
        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_uses_first_stdout_line() {
        let dir = tempfile::tempdir().unwrap();
        let provider = CommandSnapshotProvider::new(
            format!("echo; echo \"${SNAPSHOT_DIR_ENV}\"; echo ignored"),
            None,
            Duration::from_secs(5),
        );
        let snap = provider.create(dir.path()).await.unwrap().unwrap();
        assert_eq!(snap.root, dir.path());
        assert_eq!(snap.volume, dir.path());
        provider.destroy(&snap).await.unwrap();
    }

    #[tokio::test]
    async fn silent_command_produces_no_snapshot() {
        let provider = CommandSnapshotProvider::new("true".into(), None, Duration::from_secs(5));
        assert!(provider.create(Path::new("/tmp")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn failing_destroy_is_reported() {
        let provider = CommandSnapshotProvider::new(
            "echo /tmp".into(),
            Some("echo gone >&2; exit 1".into()),
            Duration::from_secs(5),
        );
        let snap = provider.create(Path::new("/tmp")).await.unwrap().unwrap();
        let err = provider.destroy(&snap).await.unwrap_err();
        assert!(err.to_string().contains("gone"));
    }
}
