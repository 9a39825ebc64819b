//! `reseed-transfer`: produces a consistent copy of the source data file.
//!
//! A [`transfer::FileTransfer`] copies through a point-in-time snapshot when
//! the configured [`snapshot::SnapshotProvider`] can make one, and falls back
//! to a direct copy otherwise. Every step is retried through
//! [`reseed_core::RetryPolicy`].
//!
//! | Provider  | Mechanism                                        |
//! |-----------|--------------------------------------------------|
//! | `vss`     | Windows Volume Shadow Copy via PowerShell/WMI    |
//! | `command` | Operator-supplied create/destroy shell commands  |
//! | `none`    | No snapshots; direct copy only                   |

pub mod command;
pub mod digest;
pub mod error;
pub mod process;
pub mod snapshot;
pub mod transfer;
pub mod vss;

pub use error::{Result, TransferError};
pub use snapshot::{build_provider, DisabledSnapshots, Snapshot, SnapshotProvider};
pub use transfer::{CopyMethod, FileTransfer, TransferReport};
