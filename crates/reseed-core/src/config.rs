use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

pub const DEFAULT_INTERVAL_MS: u64 = 3 * 60 * 1000; // 3 minutes between cycles
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 10_000;
pub const DEFAULT_LOG_FILE: &str = "reseed.log";
pub const DEFAULT_CATALOG: &str = ":memory:";
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 15_000;
pub const DEFAULT_SNAPSHOT_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_CONFIG_FILE: &str = "reseed.toml";

/// Schema names the catalog reserves for itself.
const RESERVED_NAMES: &[&str] = &["main", "temp"];

/// Top-level config (reseed.toml + RESEED_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReseedConfig {
    pub database: DatabaseConfig,
    pub source: SourceConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub snapshot: SnapshotConfig,
    #[serde(default)]
    pub transfer: TransferConfig,
}

/// Name of the single database this process manages.
///
/// Restricted to ASCII letters, digits and underscores so it can be used as a
/// schema identifier without quoting surprises.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DatabaseName(String);

impl DatabaseName {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let invalid = |reason: &str| ConfigError::InvalidDatabaseName {
            name: name.clone(),
            reason: reason.to_string(),
        };

        let first = name.chars().next().ok_or_else(|| invalid("name is empty"))?;
        if first.is_ascii_digit() {
            return Err(invalid("name must not start with a digit"));
        }
        if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(invalid("only ASCII letters, digits and '_' are allowed"));
        }
        if RESERVED_NAMES.iter().any(|r| r.eq_ignore_ascii_case(&name)) {
            return Err(invalid("name is reserved by the catalog"));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for DatabaseName {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<DatabaseName> for String {
    fn from(name: DatabaseName) -> Self {
        name.0
    }
}

impl fmt::Display for DatabaseName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub name: DatabaseName,
}

/// Where the externally-produced data file lives and where the live copy goes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub file: PathBuf,
    pub destination_dir: PathBuf,
}

impl SourceConfig {
    /// Path of the live copy: the source file name inside `destination_dir`.
    pub fn destination_file(&self) -> PathBuf {
        match self.file.file_name() {
            Some(name) => self.destination_dir.join(name),
            None => self.destination_dir.join("database.db"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

impl ScheduleConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_INTERVAL_MS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay_ms: DEFAULT_RETRY_DELAY_MS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_file")]
    pub file: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: default_log_file(),
        }
    }
}

/// Parameters for the catalog connection the database is attached to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Catalog target: a file path or `:memory:`.
    #[serde(default = "default_catalog")]
    pub catalog: String,
    /// How long a statement waits on a locked file before failing.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl ConnectionConfig {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            catalog: default_catalog(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum SnapshotProviderKind {
    /// Windows Volume Shadow Copy.
    Vss,
    /// Operator-supplied create/destroy shell commands.
    Command,
    /// No snapshot facility; every transfer uses the direct copy.
    None,
}

impl Default for SnapshotProviderKind {
    fn default() -> Self {
        if cfg!(windows) {
            SnapshotProviderKind::Vss
        } else {
            SnapshotProviderKind::None
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotConfig {
    #[serde(default)]
    pub provider: SnapshotProviderKind,
    /// Deadline for each external snapshot command.
    #[serde(default = "default_snapshot_timeout_secs")]
    pub timeout_secs: u64,
    pub create_command: Option<String>,
    pub destroy_command: Option<String>,
}

impl SnapshotConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            provider: SnapshotProviderKind::default(),
            timeout_secs: DEFAULT_SNAPSHOT_TIMEOUT_SECS,
            create_command: None,
            destroy_command: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransferConfig {
    /// Hash the destination after copying and fail on a digest mismatch.
    #[serde(default)]
    pub verify_copy: bool,
}

fn default_interval_ms() -> u64 {
    DEFAULT_INTERVAL_MS
}
fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}
fn default_retry_delay_ms() -> u64 {
    DEFAULT_RETRY_DELAY_MS
}
fn default_log_file() -> PathBuf {
    PathBuf::from(DEFAULT_LOG_FILE)
}
fn default_catalog() -> String {
    DEFAULT_CATALOG.to_string()
}
fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}
fn default_snapshot_timeout_secs() -> u64 {
    DEFAULT_SNAPSHOT_TIMEOUT_SECS
}

impl ReseedConfig {
    /// Load config from a TOML file with RESEED_* env var overrides.
    ///
    /// Nested keys use a double underscore, e.g. `RESEED_RETRY__MAX_ATTEMPTS=3`.
    /// Without an explicit path, `./reseed.toml` is read.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let path = config_path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        Self::from_figment(
            Figment::new()
                .merge(Toml::file(&path))
                .merge(Env::prefixed("RESEED_").split("__")),
        )
    }

    /// Extract and validate a config from an already-assembled figment.
    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: ReseedConfig = figment
            .extract()
            .map_err(|e| ConfigError::Load(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.schedule.interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "schedule.interval_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "retry.max_attempts",
                reason: "at least one attempt is required".to_string(),
            });
        }
        if self.source.file.file_name().is_none() {
            return Err(ConfigError::InvalidValue {
                field: "source.file",
                reason: format!("`{}` does not name a file", self.source.file.display()),
            });
        }
        if self.snapshot.provider == SnapshotProviderKind::Command
            && self
                .snapshot
                .create_command
                .as_deref()
                .map_or(true, |c| c.trim().is_empty())
        {
            return Err(ConfigError::InvalidValue {
                field: "snapshot.create_command",
                reason: "required when snapshot.provider = \"command\"".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml: &str) -> Result<ReseedConfig> {
        ReseedConfig::from_figment(Figment::new().merge(Toml::string(toml)))
    }

    const MINIMAL: &str = r#"
        [database]
        name = "Reporting"

        [source]
        file = "/exports/reporting.db"
        destination_dir = "/live"
    "#;

    #[test]
    fn minimal_config_gets_defaults() {
        let config = parse(MINIMAL).unwrap();
        assert_eq!(config.database.name.as_str(), "Reporting");
        assert_eq!(config.schedule.interval(), Duration::from_secs(180));
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.delay_ms, 10_000);
        assert_eq!(config.logging.file, PathBuf::from("reseed.log"));
        assert_eq!(config.connection.catalog, ":memory:");
        assert!(!config.transfer.verify_copy);
    }

    #[test]
    fn destination_file_keeps_source_name() {
        let config = parse(MINIMAL).unwrap();
        assert_eq!(
            config.source.destination_file(),
            PathBuf::from("/live/reporting.db")
        );
    }

    #[test]
    fn invalid_database_name_is_rejected() {
        let toml = MINIMAL.replace("\"Reporting\"", "\"drop; table\"");
        assert!(parse(&toml).is_err());
    }

    #[test]
    fn zero_interval_is_rejected() {
        let toml = format!("{MINIMAL}\n[schedule]\ninterval_ms = 0\n");
        let err = parse(&toml).unwrap_err();
        assert!(err.to_string().contains("schedule.interval_ms"));
    }

    #[test]
    fn command_provider_requires_create_command() {
        let toml = format!("{MINIMAL}\n[snapshot]\nprovider = \"command\"\n");
        let err = parse(&toml).unwrap_err();
        assert!(err.to_string().contains("snapshot.create_command"));
    }

    #[test]
    fn database_name_rules() {
        assert!(DatabaseName::new("Sales_2024").is_ok());
        assert!(DatabaseName::new("").is_err());
        assert!(DatabaseName::new("1sales").is_err());
        assert!(DatabaseName::new("sales-db").is_err());
        assert!(DatabaseName::new("MAIN").is_err());
    }
}
