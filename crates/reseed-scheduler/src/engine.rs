use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use crate::orchestrator::RefreshJob;

/// Fixed-interval trigger for a [`RefreshJob`].
///
/// Fires once at startup and then every `interval`. Each trigger runs on its
/// own task, so a cycle that panics is logged and the next tick still fires.
/// Overlap is resolved by the job itself.
pub struct RefreshScheduler {
    job: Arc<dyn RefreshJob>,
    interval: Duration,
}

impl RefreshScheduler {
    pub fn new(job: Arc<dyn RefreshJob>, interval: Duration) -> Self {
        Self { job, interval }
    }

    /// Drive the job until `shutdown` flips to `true` or its sender drops.
    ///
    /// A cycle already in flight is not cancelled.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_ms = self.interval.as_millis() as u64,
            "refresh scheduler started"
        );

        // The first tick completes immediately: that is the startup refresh.
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => self.trigger(),
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("refresh scheduler shutting down");
                        break;
                    }
                }
            }
        }
    }

    fn trigger(&self) {
        let job = Arc::clone(&self.job);
        let cycle = tokio::spawn(async move { job.refresh().await });

        tokio::spawn(async move {
            if let Err(e) = cycle.await {
                if e.is_panic() {
                    error!("Refresh cycle aborted by unhandled fault: {e}");
                }
            }
        });
    }
}
