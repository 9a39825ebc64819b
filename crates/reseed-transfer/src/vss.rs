//! Windows Volume Shadow Copy provider.
//!
//! Shadow copies are created through WMI (`Win32_ShadowCopy.Create`) from a
//! PowerShell one-shot and removed with `vssadmin`. The script prints two
//! lines, `ID=<shadow id>` and `DEVICE=<device object>`; the device object is
//! the snapshot root for the volume.

use std::path::{Component, Path, PathBuf, Prefix};
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::info;

use crate::error::{Result, TransferError};
use crate::process;
use crate::snapshot::{volume_root, Snapshot, SnapshotProvider};

const CREATE_SCRIPT: &str = r#"$ErrorActionPreference = 'Stop'
$result = (Get-WmiObject -List Win32_ShadowCopy).Create('{volume}', 'ClientAccessible')
if ($result.ReturnValue -ne 0) { throw "Win32_ShadowCopy.Create returned $($result.ReturnValue)" }
$shadow = Get-WmiObject Win32_ShadowCopy | Where-Object { $_.ID -eq $result.ShadowID }
Write-Output ("ID=" + $shadow.ID)
Write-Output ("DEVICE=" + $shadow.DeviceObject)"#;

pub struct ShadowCopyProvider {
    timeout: Duration,
}

impl ShadowCopyProvider {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl SnapshotProvider for ShadowCopyProvider {
    fn name(&self) -> &str {
        "vss"
    }

    async fn create(&self, directory_hint: &Path) -> Result<Option<Snapshot>> {
        let volume = volume_root(directory_hint);
        let drive = drive_spec(&volume).ok_or_else(|| {
            TransferError::SnapshotCreationFailed(format!(
                "{} is not on a lettered drive",
                directory_hint.display()
            ))
        })?;

        info!("Creating shadow copy of volume {drive}");
        let mut cmd = Command::new("powershell");
        cmd.args(["-NoProfile", "-NonInteractive", "-Command"])
            .arg(CREATE_SCRIPT.replace("{volume}", &drive));
        let output = process::run(cmd, self.timeout)
            .await?
            .into_checked("shadow copy creation")?;

        Ok(parse_shadow_output(&output.stdout).map(|(id, device)| Snapshot {
            id,
            volume,
            root: PathBuf::from(format!("{device}\\")),
        }))
    }

    async fn destroy(&self, snapshot: &Snapshot) -> Result<()> {
        let mut cmd = Command::new("vssadmin");
        cmd.args(["delete", "shadows"])
            .arg(format!("/Shadow={}", snapshot.id))
            .arg("/Quiet");
        process::run(cmd, self.timeout)
            .await?
            .into_checked("shadow copy deletion")?;
        info!("Deleted shadow copy {}", snapshot.id);
        Ok(())
    }
}

/// `C:\` for any path rooted on drive C, verbatim or not.
fn drive_spec(volume: &Path) -> Option<String> {
    match volume.components().next()? {
        Component::Prefix(prefix) => match prefix.kind() {
            Prefix::Disk(letter) | Prefix::VerbatimDisk(letter) => {
                Some(format!("{}:\\", letter as char))
            }
            _ => None,
        },
        _ => None,
    }
}

/// Extract `(id, device)` from the create script's output.
fn parse_shadow_output(stdout: &str) -> Option<(String, String)> {
    let mut id = None;
    let mut device = None;
    for line in stdout.lines().map(str::trim) {
        if let Some(v) = line.strip_prefix("ID=") {
            id = Some(v.trim().to_string());
        } else if let Some(v) = line.strip_prefix("DEVICE=") {
            device = Some(v.trim().trim_end_matches('\\').to_string());
        }
    }
    match (id, device) {
        (Some(id), Some(device)) if !id.is_empty() && !device.is_empty() => Some((id, device)),
        _ => None,
    }
}
