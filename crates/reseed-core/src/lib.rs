//! `reseed-core`: configuration, log sink and the retry executor shared by
//! every stage of the refresh pipeline.

pub mod config;
pub mod error;
pub mod fs;
pub mod logging;
pub mod retry;

pub use config::{DatabaseName, ReseedConfig};
pub use error::{ConfigError, RetryExhausted};
pub use retry::RetryPolicy;
