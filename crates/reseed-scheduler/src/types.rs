use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{DateTime, Utc};
use reseed_transfer::{CopyMethod, TransferReport};
use tracing::info;
use uuid::Uuid;

/// Lifecycle state of a refresh cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Running,
    Succeeded,
    Failed,
}

impl fmt::Display for CycleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CycleOutcome::Running => "running",
            CycleOutcome::Succeeded => "succeeded",
            CycleOutcome::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// One refresh invocation. Lives only for the duration of the cycle.
#[derive(Debug, Clone)]
pub struct RefreshCycle {
    /// UUID v4, tags every summary line.
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub outcome: CycleOutcome,
    pub destination: PathBuf,
    /// SHA-256 of the source file, once the transfer has succeeded.
    pub digest: Option<String>,
    pub method: Option<CopyMethod>,
    started: Instant,
}

impl RefreshCycle {
    pub fn begin(destination: &Path) -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            outcome: CycleOutcome::Running,
            destination: destination.to_path_buf(),
            digest: None,
            method: None,
            started: Instant::now(),
        }
    }

    pub fn record_transfer(&mut self, report: &TransferReport) {
        self.digest = Some(report.digest.clone());
        self.method = Some(report.method);
    }

    pub fn finish(&mut self, outcome: CycleOutcome) {
        self.outcome = outcome;
    }

    pub fn succeeded(&self) -> bool {
        self.outcome == CycleOutcome::Succeeded
    }

    pub fn log_summary(&self) {
        let method = self
            .method
            .map(|m| m.to_string())
            .unwrap_or_else(|| "none".to_string());
        info!(
            cycle = %self.id,
            outcome = %self.outcome,
            method = %method,
            digest = self.digest.as_deref().unwrap_or("-"),
            destination = %self.destination.display(),
            started_at = %self.started_at.to_rfc3339(),
            elapsed_ms = self.started.elapsed().as_millis() as u64,
            "Refresh cycle finished"
        );
    }
}
