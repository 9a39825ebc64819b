//! Refresh orchestration and its fixed-interval trigger.
//!
//! [`Refresher`] runs one cycle (drop the live database, copy the source,
//! hash it, attach the copy) under a single-flight flag.
//! [`RefreshScheduler`] fires it at startup and then on every interval.

pub mod engine;
pub mod error;
pub mod orchestrator;
pub mod types;

pub use engine::RefreshScheduler;
pub use error::RefreshError;
pub use orchestrator::{RefreshGuard, RefreshJob, RefreshState, Refresher};
pub use types::{CycleOutcome, RefreshCycle};
