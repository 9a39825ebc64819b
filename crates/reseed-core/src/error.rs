use thiserror::Error;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    Load(String),

    #[error("Invalid database name `{name}`: {reason}")]
    InvalidDatabaseName { name: String, reason: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Raised by [`crate::retry::RetryPolicy::run`] once every attempt has failed.
///
/// Carries the message of the last underlying error so the enclosing step
/// can log a single line describing why it gave up.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{operation} failed after {attempts} attempts: {last_error}")]
pub struct RetryExhausted {
    pub operation: String,
    pub attempts: u32,
    pub last_error: String,
}

pub type Result<T> = std::result::Result<T, ConfigError>;
