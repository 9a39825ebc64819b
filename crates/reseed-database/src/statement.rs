use std::fmt;
use std::path::PathBuf;

use reseed_core::DatabaseName;

/// How the data file is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachMode {
    /// Standard attach; the server replays or rebuilds the log as needed.
    RebuildLog,
    /// Discard any existing log and attach with a fresh one.
    ForceRebuildLog,
}

impl fmt::Display for AttachMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttachMode::RebuildLog => write!(f, "rebuild-log"),
            AttachMode::ForceRebuildLog => write!(f, "force-rebuild-log"),
        }
    }
}

/// Every statement the controller issues. Backends render these as
/// parameterized statements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    /// Catalog lookup: one row per database with this name.
    DatabaseExists { name: DatabaseName },
    /// Roll back open transactions, then drop the database.
    DropDatabase { name: DatabaseName },
    /// Create the database by attaching `file`.
    AttachDatabase {
        name: DatabaseName,
        file: PathBuf,
        mode: AttachMode,
    },
}

/// Rows returned by a statement; each row is its columns rendered as text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Recordset {
    pub rows: Vec<Vec<String>>,
}

impl Recordset {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
