//! One end-to-end refresh: drop, copy, hash, attach.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use reseed_core::config::SourceConfig;
use reseed_database::DatabaseController;
use reseed_transfer::FileTransfer;
use tracing::{error, info};

use crate::error::RefreshError;
use crate::types::{CycleOutcome, RefreshCycle};

/// Single-flight flag: at most one cycle runs at a time.
#[derive(Debug, Default)]
pub struct RefreshState {
    in_progress: AtomicBool,
}

impl RefreshState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the flag. `None` if a cycle already holds it.
    pub fn try_begin(&self) -> Option<RefreshGuard<'_>> {
        self.in_progress
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RefreshGuard { state: self })
    }

    pub fn is_in_progress(&self) -> bool {
        self.in_progress.load(Ordering::Acquire)
    }
}

/// Releases the flag when dropped, on every exit path including unwinding.
#[must_use = "the refresh flag is released as soon as the guard is dropped"]
pub struct RefreshGuard<'a> {
    state: &'a RefreshState,
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        self.state.in_progress.store(false, Ordering::Release);
    }
}

/// Anything the scheduler can trigger on a tick.
#[async_trait]
pub trait RefreshJob: Send + Sync {
    /// Run one cycle; `true` only if every step completed.
    async fn refresh(&self) -> bool;
}

/// Composes the database controller and the file transfer into one cycle.
pub struct Refresher {
    database: DatabaseController,
    transfer: FileTransfer,
    source: PathBuf,
    destination: PathBuf,
    state: RefreshState,
}

impl Refresher {
    pub fn new(database: DatabaseController, transfer: FileTransfer, source: &SourceConfig) -> Self {
        Self {
            database,
            transfer,
            source: source.file.clone(),
            destination: source.destination_file(),
            state: RefreshState::new(),
        }
    }

    pub fn state(&self) -> &RefreshState {
        &self.state
    }

    pub fn database(&self) -> &DatabaseController {
        &self.database
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Run one cycle unless another is already running.
    ///
    /// Errors never escape: they are logged and reported as `false`.
    pub async fn refresh(&self) -> bool {
        let Some(_guard) = self.state.try_begin() else {
            info!("Refresh already in progress, skipping this trigger");
            return false;
        };

        let mut cycle = RefreshCycle::begin(&self.destination);
        info!(cycle = %cycle.id, "Starting refresh of database {}", self.database.name());

        match self.run_cycle(&mut cycle).await {
            Ok(()) => {
                cycle.finish(CycleOutcome::Succeeded);
                info!("Database {} refreshed successfully", self.database.name());
            }
            Err(e) => {
                cycle.finish(CycleOutcome::Failed);
                error!("Database refresh failed: {e}");
            }
        }
        cycle.log_summary();
        cycle.succeeded()
    }

    async fn run_cycle(&self, cycle: &mut RefreshCycle) -> Result<(), RefreshError> {
        if self.database.exists().await? {
            self.database.drop_database().await?;
        } else {
            info!("Database {} not present, skipping drop", self.database.name());
        }

        // No restore path: if the copy fails the database stays dropped
        // until the next successful cycle.
        let report = self.transfer.transfer(&self.source, &self.destination).await?;
        cycle.record_transfer(&report);

        self.database.create(&self.destination).await?;
        Ok(())
    }
}

#[async_trait]
impl RefreshJob for Refresher {
    async fn refresh(&self) -> bool {
        Refresher::refresh(self).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_claim_is_refused_until_release() {
        let state = RefreshState::new();
        let guard = state.try_begin().unwrap();
        assert!(state.is_in_progress());
        assert!(state.try_begin().is_none());

        drop(guard);
        assert!(!state.is_in_progress());
        assert!(state.try_begin().is_some());
    }

    #[test]
    fn flag_is_released_on_panic() {
        let state = RefreshState::new();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = state.try_begin().unwrap();
            panic!("cycle blew up");
        }));
        assert!(result.is_err());
        assert!(!state.is_in_progress());
    }
}
